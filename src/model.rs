use std::borrow::Cow;

use crate::constants::{
    MECAB_BOS_NODE, MECAB_EON_NODE, MECAB_EOS_NODE, MECAB_NOR_NODE, MECAB_SYS_DIC,
    MECAB_UNK_DIC, MECAB_UNK_NODE, MECAB_USR_DIC,
};
use crate::native::{cstr_to_string, MecabDictionaryInfoRaw};
use crate::runtime::Node;
use crate::types::FormatTemplates;

/// Classification of a node (`mecab_node_t::stat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStat {
    /// Word found in a dictionary.
    Normal,
    /// Unknown word.
    Unknown,
    /// Beginning-of-sentence marker.
    Bos,
    /// End-of-sentence marker. Terminates every chain.
    Eos,
    /// End of an N-best enumeration.
    EndOfNbest,
    /// Value not defined by the MeCab version this crate mirrors.
    Other(u8),
}

impl From<u8> for NodeStat {
    fn from(value: u8) -> Self {
        match value {
            MECAB_NOR_NODE => NodeStat::Normal,
            MECAB_UNK_NODE => NodeStat::Unknown,
            MECAB_BOS_NODE => NodeStat::Bos,
            MECAB_EOS_NODE => NodeStat::Eos,
            MECAB_EON_NODE => NodeStat::EndOfNbest,
            other => NodeStat::Other(other),
        }
    }
}

impl NodeStat {
    /// Raw `stat` value.
    pub fn as_raw(self) -> u8 {
        match self {
            NodeStat::Normal => MECAB_NOR_NODE,
            NodeStat::Unknown => MECAB_UNK_NODE,
            NodeStat::Bos => MECAB_BOS_NODE,
            NodeStat::Eos => MECAB_EOS_NODE,
            NodeStat::EndOfNbest => MECAB_EON_NODE,
            NodeStat::Other(value) => value,
        }
    }

    /// Returns whether the node is a real morpheme rather than a marker.
    pub fn is_morpheme(self) -> bool {
        matches!(self, NodeStat::Normal | NodeStat::Unknown)
    }
}

/// Kind of a loaded dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryKind {
    /// System dictionary.
    System,
    /// User dictionary.
    User,
    /// Unknown-word dictionary.
    Unknown,
    /// Value not defined by the MeCab version this crate mirrors.
    Other(i32),
}

impl From<i32> for DictionaryKind {
    fn from(value: i32) -> Self {
        match value {
            MECAB_SYS_DIC => DictionaryKind::System,
            MECAB_USR_DIC => DictionaryKind::User,
            MECAB_UNK_DIC => DictionaryKind::Unknown,
            other => DictionaryKind::Other(other),
        }
    }
}

/// One entry of `mecab_dictionary_info_t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryInfo {
    /// Dictionary file path.
    pub filename: String,
    /// Character set the dictionary was compiled with.
    pub charset: String,
    /// Number of words.
    pub size: u32,
    /// Dictionary kind.
    pub kind: DictionaryKind,
    /// Left attribute size.
    pub lsize: u32,
    /// Right attribute size.
    pub rsize: u32,
    /// Dictionary format version.
    pub version: u16,
}

impl From<&MecabDictionaryInfoRaw> for DictionaryInfo {
    fn from(value: &MecabDictionaryInfoRaw) -> Self {
        Self {
            filename: cstr_to_string(value.filename),
            charset: cstr_to_string(value.charset),
            size: value.size,
            kind: DictionaryKind::from(value.kind),
            lsize: value.lsize,
            rsize: value.rsize,
            version: value.version,
        }
    }
}

/// MeCab's default line for a node when no custom template applies.
pub(crate) fn default_representation(stat: NodeStat, surface: &str, feature: &str) -> String {
    match stat {
        NodeStat::Bos => String::new(),
        NodeStat::Eos => "EOS\n".to_string(),
        _ => format!("{surface}\t{feature}\n"),
    }
}

/// Cost fields of the node that preceded a [`ClonedNode`] in the live chain.
///
/// Kept even when the predecessor itself was not copied, so a clone that
/// starts mid-chain still renders connection costs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PredecessorCost {
    pub(crate) stat: NodeStat,
    pub(crate) wcost: i16,
    pub(crate) cost: i64,
}

/// Owned copy of one node.
///
/// Holds the same fields as [`Node`] but none of the pointers into MeCab
/// memory. `prev`/`next` become positions inside the owning
/// [`ClonedResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClonedNode {
    index: usize,
    rsurface: Vec<u8>,
    leading: usize,
    feature: String,
    id: u32,
    length: u16,
    rlength: u16,
    rc_attr: u16,
    lc_attr: u16,
    posid: u16,
    char_type: u8,
    stat: NodeStat,
    is_best: bool,
    alpha: f32,
    beta: f32,
    prob: f32,
    wcost: i16,
    cost: i64,
    predecessor: Option<PredecessorCost>,
}

impl ClonedNode {
    pub(crate) fn capture(index: usize, node: &Node<'_>) -> Self {
        let rsurface = node.rsurface_bytes().to_vec();
        let leading = rsurface.len().saturating_sub(node.surface_bytes().len());
        Self {
            index,
            rsurface,
            leading,
            feature: node.feature().into_owned(),
            id: node.id(),
            length: node.length(),
            rlength: node.rlength(),
            rc_attr: node.rc_attr(),
            lc_attr: node.lc_attr(),
            posid: node.posid(),
            char_type: node.char_type(),
            stat: node.stat(),
            is_best: node.is_best(),
            alpha: node.alpha(),
            beta: node.beta(),
            prob: node.prob(),
            wcost: node.wcost(),
            cost: node.cost(),
            predecessor: node.prev().map(|prev| PredecessorCost {
                stat: prev.stat(),
                wcost: prev.wcost(),
                cost: prev.cost(),
            }),
        }
    }

    /// Position inside the owning [`ClonedResult`].
    pub fn index(&self) -> usize {
        self.index
    }

    /// Surface bytes.
    pub fn surface_bytes(&self) -> &[u8] {
        &self.rsurface[self.leading..]
    }

    /// Surface as UTF-8, replacing invalid sequences.
    pub fn surface(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.surface_bytes())
    }

    /// Surface including the preceding whitespace covered by `rlength`.
    pub fn rsurface_bytes(&self) -> &[u8] {
        &self.rsurface
    }

    /// Feature string.
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// One comma-separated field of the feature string.
    pub fn feature_field(&self, index: usize) -> Option<&str> {
        self.feature.split(',').nth(index)
    }

    /// Unique node id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Surface length in bytes.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Surface length in bytes including preceding whitespace.
    pub fn rlength(&self) -> u16 {
        self.rlength
    }

    /// Right context attribute id.
    pub fn rc_attr(&self) -> u16 {
        self.rc_attr
    }

    /// Left context attribute id.
    pub fn lc_attr(&self) -> u16 {
        self.lc_attr
    }

    /// Part-of-speech id.
    pub fn posid(&self) -> u16 {
        self.posid
    }

    /// Character type.
    pub fn char_type(&self) -> u8 {
        self.char_type
    }

    /// Node classification.
    pub fn stat(&self) -> NodeStat {
        self.stat
    }

    /// Returns whether this is a real morpheme rather than a BOS/EOS marker.
    pub fn is_morpheme(&self) -> bool {
        self.stat.is_morpheme()
    }

    /// Returns whether this is the BOS marker.
    pub fn is_bos(&self) -> bool {
        self.stat == NodeStat::Bos
    }

    /// Returns whether this is the EOS marker.
    pub fn is_eos(&self) -> bool {
        self.stat == NodeStat::Eos
    }

    /// Whether the node lies on the best path.
    pub fn is_best(&self) -> bool {
        self.is_best
    }

    /// Forward accumulated log summation.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Backward accumulated log summation.
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Marginal probability.
    pub fn prob(&self) -> f32 {
        self.prob
    }

    /// Word cost.
    pub fn wcost(&self) -> i16 {
        self.wcost
    }

    /// Best accumulated cost from BOS to this node.
    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// MeCab's default output line for this node.
    pub fn default_format(&self) -> String {
        default_representation(self.stat, &self.surface(), &self.feature)
    }

    pub(crate) fn predecessor(&self) -> Option<PredecessorCost> {
        self.predecessor
    }
}

/// Independently owned deep copy of a node chain.
///
/// Every field of every node from the starting node to the terminal marker
/// is duplicated, so memory is linear in the chain length and roughly twice
/// what the borrowed chain costs while both exist. In exchange the copy does
/// not depend on any [`Tagger`](crate::Tagger): it outlives releases and
/// re-parses, and it is `Send + Sync`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClonedResult {
    nodes: Vec<ClonedNode>,
    formats: FormatTemplates,
}

impl ClonedResult {
    /// Copies the chain starting at `node` up to its terminal marker.
    pub fn from_node(node: &Node<'_>) -> Self {
        let mut nodes = Vec::new();
        let mut current = Some(*node);
        while let Some(node) = current {
            nodes.push(ClonedNode::capture(nodes.len(), &node));
            current = node.next();
        }
        Self {
            nodes,
            formats: node.tagger().format_templates().clone(),
        }
    }

    /// First node after the BOS marker, or the EOS marker when the input
    /// produced no morphemes.
    pub fn head(&self) -> Option<&ClonedNode> {
        match self.nodes.first() {
            Some(first) if first.stat == NodeStat::Bos => self.nodes.get(1),
            first => first,
        }
    }

    /// Node following `node`, or `None` past the terminal marker.
    pub fn next(&self, node: &ClonedNode) -> Option<&ClonedNode> {
        self.nodes.get(node.index + 1)
    }

    /// Node preceding `node`.
    pub fn prev(&self, node: &ClonedNode) -> Option<&ClonedNode> {
        node.index.checked_sub(1).and_then(|index| self.nodes.get(index))
    }

    /// Node at `index`.
    pub fn get(&self, index: usize) -> Option<&ClonedNode> {
        self.nodes.get(index)
    }

    /// BOS marker, when the copy started at one.
    pub fn bos(&self) -> Option<&ClonedNode> {
        self.nodes.first().filter(|node| node.stat == NodeStat::Bos)
    }

    /// Terminal EOS marker.
    pub fn eos(&self) -> Option<&ClonedNode> {
        self.nodes.last().filter(|node| node.stat == NodeStat::Eos)
    }

    /// Iterates every node, markers included.
    pub fn iter(&self) -> std::slice::Iter<'_, ClonedNode> {
        self.nodes.iter()
    }

    /// Iterates real morphemes only.
    pub fn morphemes(&self) -> impl Iterator<Item = &ClonedNode> {
        self.nodes.iter().filter(|node| node.is_morpheme())
    }

    /// Number of nodes, markers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the copy holds no node at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Templates of the tagger the copy was taken from.
    pub fn formats(&self) -> &FormatTemplates {
        &self.formats
    }
}

impl<'r> IntoIterator for &'r ClonedResult {
    type Item = &'r ClonedNode;
    type IntoIter = std::slice::Iter<'r, ClonedNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
