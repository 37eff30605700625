use std::borrow::Cow;
use std::env;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use crate::config::MecabHandle;
use crate::constants::MECAB_PROGRAM_NAME;
use crate::discovery::{default_library_candidates, discover_default_library_path};
use crate::error::{MecabError, Result};
use crate::model::{default_representation, ClonedNode, ClonedResult, DictionaryInfo, NodeStat};
use crate::native::{
    cstr_to_string, engine_message, DynamicLibrary, LoadedLibrary, MecabApi,
    MecabDictionaryInfoRaw, MecabNodeRaw,
};
use crate::options::Options;
use crate::types::{FormatTemplates, TaggerConfig};

// `mecab_new` reports failures through a process-wide buffer read back with
// `mecab_strerror(NULL)`. Both calls must happen under this lock.
static MECAB_INIT_LOCK: Mutex<()> = Mutex::new(());

const RELEASED_MESSAGE: &str = "tagger has been released";

/// Handle to a loaded MeCab dynamic library plus resolved function table.
///
/// Cheap to clone and shareable across threads. Every [`Tagger`] keeps the
/// library it was built from alive.
#[derive(Clone)]
pub struct MecabLibrary {
    inner: Arc<LoadedLibrary>,
}

impl MecabLibrary {
    /// Loads a MeCab dynamic library from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "loading mecab library");
        let library = DynamicLibrary::open(path)?;
        Self::from_library(library)
    }

    /// Loads MeCab from common platform-specific locations and caches it.
    pub fn load_default() -> Result<Self> {
        static DEFAULT_LIBRARY: Mutex<Option<Arc<LoadedLibrary>>> = Mutex::new(None);

        let mut guard = DEFAULT_LIBRARY.lock().map_err(|_| {
            MecabError::LibraryLoad("failed to lock default library cache".to_string())
        })?;

        if let Some(inner) = guard.as_ref() {
            return Ok(Self {
                inner: inner.clone(),
            });
        }

        let inner = Self::load_default_internal()?.inner;
        *guard = Some(inner.clone());
        Ok(Self { inner })
    }

    fn load_default_internal() -> Result<Self> {
        let mut errors = Vec::new();

        if let Some(path) = discover_default_library_path() {
            match Self::load(&path) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{}: {}", path.display(), error)),
            }
        }

        for candidate in default_library_candidates() {
            match Self::load(candidate) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{candidate}: {error}")),
            }
        }

        Err(MecabError::LibraryLoad(format!(
            "set MECAB_LIBRARY_PATH to the dynamic library path. tried: {}",
            errors.join(" | ")
        )))
    }

    /// Loads from `MECAB_LIBRARY_PATH` if set, otherwise falls back to
    /// [`Self::load_default`].
    pub fn load_from_env_or_default() -> Result<Self> {
        if let Some(path) = env::var_os("MECAB_LIBRARY_PATH") {
            return Self::load(PathBuf::from(path));
        }
        Self::load_default()
    }

    fn from_library(library: DynamicLibrary) -> Result<Self> {
        let api = unsafe { MecabApi::load(&library)? };
        Ok(Self {
            inner: Arc::new(LoadedLibrary {
                _library: Some(library),
                api,
            }),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_api(api: MecabApi) -> Self {
        Self {
            inner: Arc::new(LoadedLibrary {
                _library: None,
                api,
            }),
        }
    }

    /// Version string reported by `mecab_version`.
    pub fn version(&self) -> String {
        cstr_to_string(unsafe { (self.inner.api.mecab_version)() })
    }

    /// Returns whether the N-best entry points are available.
    pub fn supports_nbest(&self) -> bool {
        let api = &self.inner.api;
        api.mecab_nbest_init2.is_some()
            && api.mecab_nbest_next_tonode.is_some()
            && api.mecab_nbest_sparse_tostr2.is_some()
    }

    /// Returns whether `mecab_dictionary_info` is available.
    pub fn supports_dictionary_info(&self) -> bool {
        self.inner.api.mecab_dictionary_info.is_some()
    }

    /// Constructs a tagger from a raw option set.
    pub fn tagger(&self, options: &Options) -> Result<Tagger> {
        Tagger::with_library(self, options)
    }

    /// Constructs a tagger from a JSON object of options.
    pub fn tagger_from_json(&self, value: &serde_json::Value) -> Result<Tagger> {
        let options = Options::from_json(value)?;
        Tagger::with_library(self, &options)
    }
}

impl fmt::Debug for MecabLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MecabLibrary")
            .field("supports_nbest", &self.supports_nbest())
            .field("supports_dictionary_info", &self.supports_dictionary_info())
            .finish()
    }
}

/// One MeCab tagger instance (`mecab_t`).
///
/// Every [`Lattice`] and [`Node`] borrows the tagger that produced it.
/// [`Tagger::parse`] takes `&mut self`, so a new parse or a
/// [`Tagger::release`] cannot happen while an earlier view is still in use.
///
/// A tagger may move between threads but cannot be shared by them: MeCab's
/// scratch buffers are not reentrant. Use one tagger per thread.
pub struct Tagger {
    inner: Arc<LoadedLibrary>,
    handle: MecabHandle,
    args: Vec<String>,
    formats: FormatTemplates,
}

// The handle is only touched through `&self`/`&mut self`, and `Tagger` is not
// `Sync`, so moving it to another thread is sound.
unsafe impl Send for Tagger {}

impl Tagger {
    /// Loads the configured library and constructs a tagger.
    ///
    /// Falls back to [`MecabLibrary::load_default`] when
    /// [`TaggerConfig::library_path`] is unset.
    pub fn new(config: &TaggerConfig) -> Result<Self> {
        let library = match &config.library_path {
            Some(path) => MecabLibrary::load(path)?,
            None => MecabLibrary::load_default()?,
        };
        Self::with_library(&library, &config.to_options())
    }

    /// Constructs a tagger with the library from `MECAB_LIBRARY_PATH` or the
    /// default locations.
    pub fn from_options(options: Options) -> Result<Self> {
        let library = MecabLibrary::load_from_env_or_default()?;
        Self::with_library(&library, &options)
    }

    /// Constructs a tagger on an already loaded library.
    ///
    /// Options are encoded first; a malformed option set fails with
    /// [`MecabError::Configuration`] before MeCab is called. Anything MeCab
    /// itself rejects is returned as [`MecabError::Construction`] carrying
    /// MeCab's message.
    pub fn with_library(library: &MecabLibrary, options: &Options) -> Result<Self> {
        let args = options.encode()?;
        let formats = FormatTemplates::from_options(options);

        let mut argv_owned = Vec::with_capacity(args.len() + 1);
        argv_owned.push(CString::new(MECAB_PROGRAM_NAME)?);
        for arg in &args {
            argv_owned.push(CString::new(arg.as_str())?);
        }
        let mut argv: Vec<*mut c_char> = argv_owned
            .iter()
            .map(|arg| arg.as_ptr() as *mut c_char)
            .collect();
        let argc = c_int::try_from(argv.len())
            .map_err(|_| MecabError::Configuration("too many options".to_string()))?;

        let api = &library.inner.api;
        debug!(args = ?args, "constructing mecab tagger");
        let handle = {
            let _guard = MECAB_INIT_LOCK
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let handle = unsafe { (api.mecab_new)(argc, argv.as_mut_ptr()) };
            if handle.is_null() {
                return Err(MecabError::Construction(engine_message(
                    api,
                    ptr::null_mut(),
                    "mecab_new returned a null handle",
                )));
            }
            handle
        };

        Ok(Self {
            inner: library.inner.clone(),
            handle,
            args,
            formats,
        })
    }

    fn api(&self) -> &MecabApi {
        &self.inner.api
    }

    fn live_handle(&self, error: fn(String) -> MecabError) -> Result<MecabHandle> {
        if self.handle.is_null() {
            return Err(error(RELEASED_MESSAGE.to_string()));
        }
        Ok(self.handle)
    }

    /// Parses `text` and returns the best path as a borrowed lattice.
    ///
    /// The lattice stays valid until the tagger is parsed again or released.
    /// A failed parse leaves the tagger usable.
    pub fn parse(&mut self, text: &str) -> Result<Lattice<'_>> {
        let handle = self.live_handle(MecabError::Parse)?;
        trace!(bytes = text.len(), "parsing input");
        let raw = unsafe {
            (self.api().mecab_sparse_tonode2)(handle, text.as_ptr().cast(), text.len())
        };
        if raw.is_null() {
            return Err(MecabError::Parse(engine_message(
                self.api(),
                handle,
                "mecab_sparse_tonode2 returned a null node",
            )));
        }
        Ok(Lattice {
            tagger: &*self,
            bos: unsafe { &*raw },
        })
    }

    /// Parses `text` and returns MeCab's formatted output.
    pub fn parse_to_string(&mut self, text: &str) -> Result<String> {
        let handle = self.live_handle(MecabError::Parse)?;
        trace!(bytes = text.len(), "parsing input to string");
        let output = unsafe {
            (self.api().mecab_sparse_tostr2)(handle, text.as_ptr().cast(), text.len())
        };
        if output.is_null() {
            return Err(MecabError::Parse(engine_message(
                self.api(),
                handle,
                "mecab_sparse_tostr2 returned null",
            )));
        }
        Ok(cstr_to_string(output))
    }

    /// Returns up to `n` best paths, each copied into a [`ClonedResult`].
    ///
    /// MeCab reuses its buffers for every path, so each one is copied before
    /// the next is requested.
    pub fn parse_nbest(&mut self, n: usize, text: &str) -> Result<Vec<ClonedResult>> {
        if n == 0 {
            return Err(MecabError::InvalidArgument(
                "n must be at least 1".to_string(),
            ));
        }
        let handle = self.live_handle(MecabError::Parse)?;
        let init = require_optional_api(self.api().mecab_nbest_init2, "mecab_nbest_init2")?;
        let next =
            require_optional_api(self.api().mecab_nbest_next_tonode, "mecab_nbest_next_tonode")?;

        trace!(bytes = text.len(), n, "parsing input for n-best");
        if unsafe { init(handle, text.as_ptr().cast(), text.len()) } == 0 {
            return Err(MecabError::Parse(engine_message(
                self.api(),
                handle,
                "mecab_nbest_init2 failed",
            )));
        }

        let mut results = Vec::with_capacity(n);
        while results.len() < n {
            let raw = unsafe { next(handle) };
            if raw.is_null() {
                break;
            }
            let node = Node {
                tagger: &*self,
                raw: unsafe { &*raw },
            };
            results.push(ClonedResult::from_node(&node));
        }
        Ok(results)
    }

    /// Returns MeCab's formatted output for up to `n` best paths.
    pub fn parse_nbest_to_string(&mut self, n: usize, text: &str) -> Result<String> {
        if n == 0 {
            return Err(MecabError::InvalidArgument(
                "n must be at least 1".to_string(),
            ));
        }
        let handle = self.live_handle(MecabError::Parse)?;
        let nbest_tostr = require_optional_api(
            self.api().mecab_nbest_sparse_tostr2,
            "mecab_nbest_sparse_tostr2",
        )?;
        trace!(bytes = text.len(), n, "parsing input for n-best string");
        let output = unsafe { nbest_tostr(handle, n, text.as_ptr().cast(), text.len()) };
        if output.is_null() {
            return Err(MecabError::Parse(engine_message(
                self.api(),
                handle,
                "mecab_nbest_sparse_tostr2 returned null",
            )));
        }
        Ok(cstr_to_string(output))
    }

    /// Destroys the MeCab instance. Calling it again does nothing.
    ///
    /// Also run on drop.
    pub fn release(&mut self) {
        if self.handle.is_null() {
            return;
        }
        debug!("releasing mecab tagger");
        unsafe {
            (self.inner.api.mecab_destroy)(self.handle);
        }
        self.handle = ptr::null_mut();
    }

    /// Returns whether [`Self::release`] has run.
    pub fn is_released(&self) -> bool {
        self.handle.is_null()
    }

    /// Encoded argument vector, without the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Output templates the tagger was constructed with.
    pub fn format_templates(&self) -> &FormatTemplates {
        &self.formats
    }

    /// Returns whether custom node rendering was configured.
    pub fn has_custom_format(&self) -> bool {
        self.formats.is_custom()
    }

    /// Library this tagger was built from.
    pub fn library(&self) -> MecabLibrary {
        MecabLibrary {
            inner: self.inner.clone(),
        }
    }

    /// Dictionaries loaded by this tagger, system dictionary first.
    pub fn dictionary_info(&self) -> Result<Vec<DictionaryInfo>> {
        let handle = self.live_handle(MecabError::Api)?;
        let dictionary_info =
            require_optional_api(self.api().mecab_dictionary_info, "mecab_dictionary_info")?;

        let mut infos = Vec::new();
        let mut current = unsafe { dictionary_info(handle) };
        while !current.is_null() {
            let raw = unsafe { &*current };
            infos.push(DictionaryInfo::from(raw));
            current = raw.next as *const MecabDictionaryInfoRaw;
        }
        Ok(infos)
    }

    /// Renders `node` with MeCab's template engine.
    ///
    /// Without custom format configuration the node's default representation
    /// is returned and MeCab is not called. A node produced by another tagger
    /// is a [`MecabError::Format`].
    pub fn format_node(&self, node: &Node<'_>) -> Result<String> {
        let handle = self.live_handle(MecabError::Format)?;
        if !ptr::eq(node.tagger, self) {
            return Err(MecabError::Format(
                "node was produced by a different tagger".to_string(),
            ));
        }
        if !self.formats.is_custom() {
            return Ok(node.default_format());
        }
        Ok(self
            .render(handle, node.raw)
            .unwrap_or_else(|| node.default_format()))
    }

    /// Renders a node of a [`ClonedResult`] with this tagger's templates.
    ///
    /// The node is rebuilt as a detached `mecab_node_t` carrying its surface,
    /// feature, costs and predecessor cost. Path directives (`%pl`, `%pL` and
    /// friends that walk lattice paths) must not be used in templates
    /// rendered this way. A clone captured under different templates is a
    /// [`MecabError::Format`].
    pub fn format_cloned(&self, result: &ClonedResult, node: &ClonedNode) -> Result<String> {
        let handle = self.live_handle(MecabError::Format)?;
        if result.formats() != &self.formats {
            return Err(MecabError::Format(
                "cloned result was captured under different format templates".to_string(),
            ));
        }
        if result.get(node.index()) != Some(node) {
            return Err(MecabError::Format(
                "node does not belong to this cloned result".to_string(),
            ));
        }
        if !self.formats.is_custom() {
            return Ok(node.default_format());
        }
        let detached = DetachedNode::new(node)?;
        Ok(self
            .render(handle, detached.as_raw())
            .unwrap_or_else(|| node.default_format()))
    }

    /// Like [`Self::format_node`] but falls back to the default
    /// representation instead of failing.
    pub fn format_or_default(&self, node: &Node<'_>) -> String {
        self.format_node(node).unwrap_or_else(|error| {
            warn!(%error, "falling back to default node representation");
            node.default_format()
        })
    }

    /// Like [`Self::format_cloned`] but falls back to the node's default
    /// representation instead of failing.
    pub fn format_cloned_or_default(&self, result: &ClonedResult, node: &ClonedNode) -> String {
        self.format_cloned(result, node).unwrap_or_else(|error| {
            warn!(%error, "falling back to default node representation");
            node.default_format()
        })
    }

    fn render(&self, handle: MecabHandle, raw: *const MecabNodeRaw) -> Option<String> {
        let output = unsafe { (self.api().mecab_format_node)(handle, raw) };
        if output.is_null() {
            let message = engine_message(self.api(), handle, "mecab_format_node returned null");
            warn!(%message, "falling back to default node representation");
            return None;
        }
        Some(cstr_to_string(output))
    }
}

impl Drop for Tagger {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagger")
            .field("args", &self.args)
            .field("released", &self.is_released())
            .finish()
    }
}

fn require_optional_api<T: Copy>(function: Option<T>, symbol: &str) -> Result<T> {
    function.ok_or_else(|| {
        MecabError::Api(format!("{symbol} is unavailable in the loaded MeCab library"))
    })
}

/// Best path of one parse, borrowed from its [`Tagger`].
///
/// Starts at the BOS marker and ends at the EOS marker.
#[derive(Clone, Copy)]
pub struct Lattice<'a> {
    tagger: &'a Tagger,
    bos: &'a MecabNodeRaw,
}

impl<'a> Lattice<'a> {
    /// Beginning-of-sentence marker.
    pub fn bos(&self) -> Node<'a> {
        Node {
            tagger: self.tagger,
            raw: self.bos,
        }
    }

    /// First node after BOS. For input without morphemes this is the EOS
    /// marker.
    pub fn head(&self) -> Node<'a> {
        let bos = self.bos();
        bos.next().unwrap_or(bos)
    }

    /// Terminal EOS marker.
    pub fn eos(&self) -> Option<Node<'a>> {
        self.iter().last().filter(|node| node.stat() == NodeStat::Eos)
    }

    /// Iterates every node from BOS to EOS.
    pub fn iter(&self) -> Nodes<'a> {
        Nodes {
            next: Some(self.bos()),
        }
    }

    /// Iterates real morphemes only.
    pub fn morphemes(&self) -> impl Iterator<Item = Node<'a>> {
        self.iter().filter(|node| node.is_morpheme())
    }

    /// Number of nodes, markers included.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always false: a lattice holds at least its BOS marker.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Deep copy of the whole chain.
    pub fn to_owned_result(&self) -> ClonedResult {
        ClonedResult::from_node(&self.bos())
    }

    /// Tagger that produced this lattice.
    pub fn tagger(&self) -> &'a Tagger {
        self.tagger
    }
}

impl<'a> IntoIterator for Lattice<'a> {
    type Item = Node<'a>;
    type IntoIter = Nodes<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Lattice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Forward iterator over a node chain.
#[derive(Clone)]
pub struct Nodes<'a> {
    next: Option<Node<'a>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}

/// One node of a borrowed lattice (`mecab_node_t`).
///
/// Reading a node is only valid while its tagger neither re-parses nor
/// releases. In safe code the borrow checker enforces this. Through
/// [`Node::as_ptr`] it becomes the caller's obligation: dereferencing the
/// pointer after either event reads freed or overwritten memory. Field
/// access is not guarded at runtime.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tagger: &'a Tagger,
    raw: &'a MecabNodeRaw,
}

impl<'a> Node<'a> {
    fn link(&self, pointer: *mut MecabNodeRaw) -> Option<Node<'a>> {
        if pointer.is_null() {
            return None;
        }
        Some(Node {
            tagger: self.tagger,
            raw: unsafe { &*pointer },
        })
    }

    /// Next node on the best path, `None` after EOS.
    pub fn next(&self) -> Option<Node<'a>> {
        if self.stat() == NodeStat::Eos {
            return None;
        }
        self.link(self.raw.next)
    }

    /// Previous node on the best path, `None` before BOS.
    pub fn prev(&self) -> Option<Node<'a>> {
        if self.stat() == NodeStat::Bos {
            return None;
        }
        self.link(self.raw.prev)
    }

    /// Next node ending at the same position.
    pub fn enext(&self) -> Option<Node<'a>> {
        self.link(self.raw.enext)
    }

    /// Next node beginning at the same position.
    pub fn bnext(&self) -> Option<Node<'a>> {
        self.link(self.raw.bnext)
    }

    /// Surface bytes. Not NUL terminated in MeCab's memory.
    pub fn surface_bytes(&self) -> &'a [u8] {
        let length = usize::from(self.raw.length);
        if self.raw.surface.is_null() || length == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.raw.surface.cast::<u8>(), length) }
    }

    /// Surface as UTF-8, replacing invalid sequences.
    pub fn surface(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.surface_bytes())
    }

    /// Surface including the preceding whitespace covered by `rlength`.
    pub fn rsurface_bytes(&self) -> &'a [u8] {
        let rlength = usize::from(self.raw.rlength);
        if self.raw.surface.is_null() || rlength == 0 {
            return self.surface_bytes();
        }
        let leading = rlength.saturating_sub(usize::from(self.raw.length));
        unsafe { slice::from_raw_parts(self.raw.surface.cast::<u8>().sub(leading), rlength) }
    }

    /// Feature bytes.
    pub fn feature_bytes(&self) -> &'a [u8] {
        if self.raw.feature.is_null() {
            return &[];
        }
        unsafe { CStr::from_ptr(self.raw.feature) }.to_bytes()
    }

    /// Feature string, replacing invalid UTF-8 sequences.
    pub fn feature(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.feature_bytes())
    }

    /// One comma-separated field of the feature string.
    pub fn feature_field(&self, index: usize) -> Option<Cow<'a, str>> {
        self.feature_bytes()
            .split(|byte| *byte == b',')
            .nth(index)
            .map(String::from_utf8_lossy)
    }

    /// Unique node id.
    pub fn id(&self) -> u32 {
        self.raw.id
    }

    /// Surface length in bytes.
    pub fn length(&self) -> u16 {
        self.raw.length
    }

    /// Surface length in bytes including preceding whitespace.
    pub fn rlength(&self) -> u16 {
        self.raw.rlength
    }

    /// Right context attribute id.
    pub fn rc_attr(&self) -> u16 {
        self.raw.rc_attr
    }

    /// Left context attribute id.
    pub fn lc_attr(&self) -> u16 {
        self.raw.lc_attr
    }

    /// Part-of-speech id.
    pub fn posid(&self) -> u16 {
        self.raw.posid
    }

    /// Character type.
    pub fn char_type(&self) -> u8 {
        self.raw.char_type
    }

    /// Node classification.
    pub fn stat(&self) -> NodeStat {
        NodeStat::from(self.raw.stat)
    }

    /// Returns whether this is a real morpheme rather than a marker.
    pub fn is_morpheme(&self) -> bool {
        self.stat().is_morpheme()
    }

    /// Returns whether this is the BOS marker.
    pub fn is_bos(&self) -> bool {
        self.stat() == NodeStat::Bos
    }

    /// Returns whether this is the EOS marker.
    pub fn is_eos(&self) -> bool {
        self.stat() == NodeStat::Eos
    }

    /// Whether the node lies on the best path.
    pub fn is_best(&self) -> bool {
        self.raw.isbest != 0
    }

    /// Forward accumulated log summation.
    pub fn alpha(&self) -> f32 {
        self.raw.alpha
    }

    /// Backward accumulated log summation.
    pub fn beta(&self) -> f32 {
        self.raw.beta
    }

    /// Marginal probability.
    pub fn prob(&self) -> f32 {
        self.raw.prob
    }

    /// Word cost.
    pub fn wcost(&self) -> i16 {
        self.raw.wcost
    }

    /// Best accumulated cost from BOS to this node.
    pub fn cost(&self) -> i64 {
        i64::from(self.raw.cost)
    }

    /// Tagger that produced this node.
    pub fn tagger(&self) -> &'a Tagger {
        self.tagger
    }

    /// Renders the node with its tagger's templates.
    pub fn format(&self) -> Result<String> {
        self.tagger.format_node(self)
    }

    /// MeCab's default output line for this node.
    pub fn default_format(&self) -> String {
        default_representation(self.stat(), &self.surface(), &self.feature())
    }

    /// Deep copy of the chain from this node to EOS.
    pub fn to_owned_chain(&self) -> ClonedResult {
        ClonedResult::from_node(self)
    }

    /// Raw `mecab_node_t *`.
    ///
    /// Valid only until the tagger re-parses or is released.
    pub fn as_ptr(&self) -> *const c_void {
        (self.raw as *const MecabNodeRaw).cast()
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("surface", &self.surface())
            .field("feature", &self.feature())
            .field("stat", &self.stat())
            .field("cost", &self.cost())
            .finish()
    }
}

/// A `mecab_node_t` rebuilt from a [`ClonedNode`] for rendering.
struct DetachedNode {
    node: Box<MecabNodeRaw>,
    _prev: Option<Box<MecabNodeRaw>>,
    _rsurface: Vec<u8>,
    _feature: CString,
}

impl DetachedNode {
    fn new(cloned: &ClonedNode) -> Result<Self> {
        let rsurface = cloned.rsurface_bytes().to_vec();
        let leading = rsurface.len().saturating_sub(cloned.surface_bytes().len());
        let feature = CString::new(cloned.feature())?;

        let mut prev = cloned.predecessor().map(|previous| {
            let mut raw = MecabNodeRaw::zeroed();
            raw.stat = previous.stat.as_raw();
            raw.wcost = previous.wcost;
            raw.cost = previous.cost as _;
            Box::new(raw)
        });

        let mut raw = MecabNodeRaw::zeroed();
        raw.surface = rsurface[leading..].as_ptr().cast();
        raw.feature = feature.as_ptr();
        raw.id = cloned.id();
        raw.length = cloned.length();
        raw.rlength = cloned.rlength();
        raw.rc_attr = cloned.rc_attr();
        raw.lc_attr = cloned.lc_attr();
        raw.posid = cloned.posid();
        raw.char_type = cloned.char_type();
        raw.stat = cloned.stat().as_raw();
        raw.isbest = u8::from(cloned.is_best());
        raw.alpha = cloned.alpha();
        raw.beta = cloned.beta();
        raw.prob = cloned.prob();
        raw.wcost = cloned.wcost();
        raw.cost = cloned.cost() as _;
        if let Some(prev) = prev.as_mut() {
            raw.prev = &mut **prev as *mut MecabNodeRaw;
        }

        Ok(Self {
            node: Box::new(raw),
            _prev: prev,
            _rsurface: rsurface,
            _feature: feature,
        })
    }

    fn as_raw(&self) -> *const MecabNodeRaw {
        &*self.node
    }
}
