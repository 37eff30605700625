use std::cell::RefCell;
use std::collections::BTreeMap;
use std::env;
use std::ffi::{CStr, CString, OsString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;
use std::sync::{Mutex, OnceLock};

use crate::config::MecabHandle;
use crate::native::{MecabApi, MecabDictionaryInfoRaw, MecabNodeRaw};
use crate::runtime::MecabLibrary;
use crate::{
    MECAB_BOS_NODE, MECAB_EOS_NODE, MECAB_NOR_NODE, MECAB_SYS_DIC, MECAB_UNK_NODE, MECAB_USR_DIC,
};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn set_env_var(key: &str, value: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::remove_var(key);
    }
}

/// Runs a closure while holding a global environment lock and applying overrides.
pub(crate) fn with_env_vars<T>(overrides: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let backups: Vec<(&str, Option<OsString>)> = overrides
        .iter()
        .map(|(key, _)| (*key, env::var_os(key)))
        .collect();

    for (key, value) in overrides {
        match value {
            Some(value) => set_env_var(key, value),
            None => remove_env_var(key),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (key, value) in backups.into_iter().rev() {
        match value {
            Some(value) => {
                #[allow(unused_unsafe)]
                unsafe {
                    env::set_var(key, value);
                }
            }
            None => remove_env_var(key),
        }
    }

    match result {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Calls made into the stub engine on the current thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct StubLog {
    pub(crate) new_calls: usize,
    pub(crate) destroy_calls: usize,
    pub(crate) parse_calls: usize,
    pub(crate) format_calls: usize,
    /// Full argv of the last `mecab_new`, program name included.
    pub(crate) last_args: Vec<String>,
}

thread_local! {
    static STUB_LOG: RefCell<StubLog> = RefCell::new(StubLog::default());
    static GLOBAL_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

fn record(f: impl FnOnce(&mut StubLog)) {
    STUB_LOG.with(|log| f(&mut log.borrow_mut()));
}

/// Snapshot of the current thread's stub log.
pub(crate) fn stub_log() -> StubLog {
    STUB_LOG.with(|log| log.borrow().clone())
}

pub(crate) fn reset_stub_log() {
    STUB_LOG.with(|log| *log.borrow_mut() = StubLog::default());
}

/// Text that makes the stub fail a parse.
pub(crate) const STUB_PARSE_FAILURE: &str = "\u{7}";

const STUB_BOS_EOS_FEATURE: &str = "BOS/EOS,*,*,*,*,*,*,*,*";
const STUB_NBEST_PATHS: usize = 2;
const STUB_NBEST_COST_STEP: i64 = 50;

/// Library backed by the stub engine, with every optional symbol.
pub(crate) fn stub_library() -> MecabLibrary {
    MecabLibrary::from_api(stub_api())
}

/// Library backed by the stub engine, without N-best and dictionary info.
pub(crate) fn stub_library_without_optional_symbols() -> MecabLibrary {
    let mut api = stub_api();
    api.mecab_nbest_init2 = None;
    api.mecab_nbest_next_tonode = None;
    api.mecab_nbest_sparse_tostr2 = None;
    api.mecab_dictionary_info = None;
    MecabLibrary::from_api(api)
}

fn stub_api() -> MecabApi {
    MecabApi {
        mecab_version: stub_version,
        mecab_new: stub_new,
        mecab_strerror: stub_strerror,
        mecab_destroy: stub_destroy,
        mecab_sparse_tonode2: stub_sparse_tonode2,
        mecab_sparse_tostr2: stub_sparse_tostr2,
        mecab_format_node: stub_format_node,
        mecab_nbest_init2: Some(stub_nbest_init2),
        mecab_nbest_next_tonode: Some(stub_nbest_next_tonode),
        mecab_nbest_sparse_tostr2: Some(stub_nbest_sparse_tostr2),
        mecab_dictionary_info: Some(stub_dictionary_info),
    }
}

const KNOWN_OPTIONS: &[&str] = &[
    "dicdir",
    "userdic",
    "rcfile",
    "output-format-type",
    "node-format",
    "unk-format",
    "bos-format",
    "eos-format",
    "eon-format",
    "unk-feature",
    "input-buffer-size",
    "lattice-level",
    "theta",
    "cost-factor",
    "max-grouping-size",
    "nbest",
    "all-morphs",
    "partial",
    "allocate-sentence",
    "marginal",
    "version",
    "help",
];

/// Engine state behind one stub `mecab_t *`.
struct StubTagger {
    options: BTreeMap<String, Option<String>>,
    sentence: Vec<u8>,
    features: Vec<CString>,
    nodes: Vec<Box<MecabNodeRaw>>,
    output: CString,
    error: CString,
    nbest_sentence: Vec<u8>,
    nbest_served: usize,
    _dictionary_names: Vec<CString>,
    dictionaries: Vec<Box<MecabDictionaryInfoRaw>>,
}

impl StubTagger {
    fn new(options: BTreeMap<String, Option<String>>) -> Self {
        let mut names = vec![
            CString::new("/stub/dic/sys.dic").unwrap_or_default(),
            CString::new("UTF-8").unwrap_or_default(),
        ];
        if let Some(Some(userdic)) = options.get("userdic") {
            names.push(CString::new(userdic.as_str()).unwrap_or_default());
        }

        let mut dictionaries = vec![Box::new(MecabDictionaryInfoRaw {
            filename: names[0].as_ptr(),
            charset: names[1].as_ptr(),
            size: 4,
            kind: MECAB_SYS_DIC,
            lsize: 10,
            rsize: 10,
            version: 102,
            next: ptr::null_mut(),
        })];
        if names.len() == 3 {
            dictionaries.push(Box::new(MecabDictionaryInfoRaw {
                filename: names[2].as_ptr(),
                charset: names[1].as_ptr(),
                size: 1,
                kind: MECAB_USR_DIC,
                lsize: 10,
                rsize: 10,
                version: 102,
                next: ptr::null_mut(),
            }));
            let user: *mut MecabDictionaryInfoRaw = &mut *dictionaries[1];
            dictionaries[0].next = user;
        }

        Self {
            options,
            sentence: Vec::new(),
            features: Vec::new(),
            nodes: Vec::new(),
            output: CString::default(),
            error: CString::default(),
            nbest_sentence: Vec::new(),
            nbest_served: 0,
            _dictionary_names: names,
            dictionaries,
        }
    }

    fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|value| value.as_deref())
    }

    fn fail(&mut self, message: &str) {
        self.error = CString::new(message).unwrap_or_default();
    }

    /// Splits on ASCII whitespace into BOS, one node per token, EOS.
    fn build_lattice(&mut self, text: &[u8], cost_offset: i64) -> *const MecabNodeRaw {
        self.sentence = text.to_vec();
        self.features.clear();
        self.nodes.clear();

        let base = self.sentence.as_ptr();
        let mut spans = Vec::new();
        let mut cursor = 0;
        while cursor < self.sentence.len() {
            let leading_start = cursor;
            while cursor < self.sentence.len() && self.sentence[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            let start = cursor;
            while cursor < self.sentence.len() && !self.sentence[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            if cursor > start {
                spans.push((leading_start, start, cursor));
            }
        }

        self.features.push(CString::new(STUB_BOS_EOS_FEATURE).unwrap_or_default());
        let mut bos = MecabNodeRaw::zeroed();
        bos.surface = base.cast();
        bos.feature = self.features[0].as_ptr();
        bos.stat = MECAB_BOS_NODE;
        bos.isbest = 1;
        bos.cost = cost_offset as _;
        self.nodes.push(Box::new(bos));

        let mut cost = cost_offset;
        for (index, (leading_start, start, end)) in spans.into_iter().enumerate() {
            let token = &self.sentence[start..end];
            let unknown = token.iter().all(u8::is_ascii_digit);
            let feature = if unknown { "NUM,*,*" } else { "NOUN,*,*" };
            self.features.push(CString::new(feature).unwrap_or_default());

            let wcost: i16 = if unknown { 200 } else { 100 };
            cost += i64::from(wcost) + 10;

            let mut node = MecabNodeRaw::zeroed();
            node.surface = unsafe { base.add(start) }.cast();
            node.feature = self.features[index + 1].as_ptr();
            node.id = (index + 1) as u32;
            node.length = (end - start) as u16;
            node.rlength = (end - leading_start) as u16;
            node.rc_attr = 5;
            node.lc_attr = 5;
            node.posid = if unknown { 0 } else { 38 };
            node.char_type = if unknown { 4 } else { 2 };
            node.stat = if unknown { MECAB_UNK_NODE } else { MECAB_NOR_NODE };
            node.isbest = 1;
            node.prob = 1.0;
            node.wcost = wcost;
            node.cost = cost as _;
            self.nodes.push(Box::new(node));
        }

        let mut eos = MecabNodeRaw::zeroed();
        eos.surface = unsafe { base.add(self.sentence.len()) }.cast();
        eos.feature = self.features[0].as_ptr();
        eos.id = self.nodes.len() as u32;
        eos.stat = MECAB_EOS_NODE;
        eos.isbest = 1;
        eos.cost = (cost + 10) as _;
        self.nodes.push(Box::new(eos));

        let pointers: Vec<*mut MecabNodeRaw> = self
            .nodes
            .iter_mut()
            .map(|node| &mut **node as *mut MecabNodeRaw)
            .collect();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if index > 0 {
                node.prev = pointers[index - 1];
            }
            node.next = pointers.get(index + 1).copied().unwrap_or(ptr::null_mut());
        }
        pointers[0]
    }

    fn template_for(&self, stat: u8) -> Option<String> {
        let custom = |name: &str| self.option(name).map(str::to_string);
        match stat {
            MECAB_BOS_NODE => Some(custom("bos-format").unwrap_or_default()),
            MECAB_EOS_NODE => Some(custom("eos-format").unwrap_or_else(|| "EOS\\n".to_string())),
            MECAB_UNK_NODE => custom("unk-format").or_else(|| custom("node-format")),
            _ => custom("node-format"),
        }
    }

    /// Output of `mecab_sparse_tostr2` for the current lattice.
    fn render_lattice(&self) -> String {
        let custom = [
            "output-format-type",
            "node-format",
            "unk-format",
            "bos-format",
            "eos-format",
            "eon-format",
        ]
        .iter()
        .any(|name| self.option(name).is_some());
        self.nodes
            .iter()
            .map(|node| {
                let node: &MecabNodeRaw = node;
                let template = if custom {
                    self.template_for(node.stat)
                } else {
                    None
                };
                match (template, node.stat) {
                    (Some(template), _) => render_template(&template, node),
                    (None, MECAB_BOS_NODE) => String::new(),
                    (None, MECAB_EOS_NODE) => "EOS\n".to_string(),
                    (None, _) => render_template("%m\\t%H\\n", node),
                }
            })
            .collect()
    }
}

unsafe fn stub_state<'a>(handle: MecabHandle) -> &'a mut StubTagger {
    &mut *(handle as *mut StubTagger)
}

unsafe fn node_bytes<'a>(pointer: *const c_char, length: usize) -> &'a [u8] {
    if pointer.is_null() || length == 0 {
        return &[];
    }
    slice::from_raw_parts(pointer.cast(), length)
}

/// Expands the subset of MeCab's template language the tests use.
fn render_template(template: &str, node: &MecabNodeRaw) -> String {
    let surface = unsafe { node_bytes(node.surface, usize::from(node.length)) };
    let leading = usize::from(node.rlength).saturating_sub(usize::from(node.length));
    let rsurface = if leading == 0 {
        surface
    } else {
        unsafe { node_bytes(node.surface.sub(leading), usize::from(node.rlength)) }
    };
    let feature = if node.feature.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(node.feature) }
            .to_string_lossy()
            .into_owned()
    };

    let mut output = String::new();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => output.push('\n'),
                Some('t') => output.push('\t'),
                Some(other) => output.push(other),
                None => output.push('\\'),
            },
            '%' => match chars.next() {
                Some('m') => output.push_str(&String::from_utf8_lossy(surface)),
                Some('M') => output.push_str(&String::from_utf8_lossy(rsurface)),
                Some('H') => output.push_str(&feature),
                Some('c') => output.push_str(&node.wcost.to_string()),
                Some('s') => output.push_str(&node.stat.to_string()),
                Some('%') => output.push('%'),
                Some('f') => {
                    if chars.peek() == Some(&'[') {
                        chars.next();
                        let digits: String = chars.by_ref().take_while(|c| *c != ']').collect();
                        let index = digits.parse::<usize>().unwrap_or(usize::MAX);
                        output.push_str(feature.split(',').nth(index).unwrap_or(""));
                    }
                }
                Some('p') => {
                    if chars.next() == Some('C') {
                        let prev_cost = if node.prev.is_null() {
                            0
                        } else {
                            i64::from(unsafe { (*node.prev).cost })
                        };
                        let connection =
                            i64::from(node.cost) - prev_cost - i64::from(node.wcost);
                        output.push_str(&connection.to_string());
                    }
                }
                Some(other) => {
                    output.push('%');
                    output.push(other);
                }
                None => output.push('%'),
            },
            other => output.push(other),
        }
    }
    output
}

unsafe extern "C" fn stub_version() -> *const c_char {
    b"0.996-stub\0".as_ptr().cast()
}

unsafe extern "C" fn stub_new(argc: c_int, argv: *mut *mut c_char) -> MecabHandle {
    let args: Vec<String> = (0..argc.max(0) as usize)
        .map(|index| {
            CStr::from_ptr(*argv.add(index))
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    record(|log| {
        log.new_calls += 1;
        log.last_args = args.clone();
    });

    let mut options = BTreeMap::new();
    for arg in args.iter().skip(1) {
        let Some(flag) = arg.strip_prefix("--") else {
            set_global_error(&format!("unrecognized argument `{arg}`"));
            return ptr::null_mut();
        };
        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (flag.to_string(), None),
        };
        if !KNOWN_OPTIONS.contains(&name.as_str()) {
            set_global_error(&format!("unrecognized option `--{name}`"));
            return ptr::null_mut();
        }
        options.insert(name, value);
    }

    if let Some(Some(dicdir)) = options.get("dicdir") {
        if dicdir.starts_with("/nonexistent") {
            set_global_error(&format!("no such file or directory: {dicdir}/dicrc"));
            return ptr::null_mut();
        }
    }

    Box::into_raw(Box::new(StubTagger::new(options))).cast()
}

fn set_global_error(message: &str) {
    GLOBAL_ERROR.with(|error| *error.borrow_mut() = CString::new(message).unwrap_or_default());
}

unsafe extern "C" fn stub_strerror(handle: MecabHandle) -> *const c_char {
    if handle.is_null() {
        return GLOBAL_ERROR.with(|error| error.borrow().as_ptr());
    }
    stub_state(handle).error.as_ptr()
}

unsafe extern "C" fn stub_destroy(handle: MecabHandle) {
    record(|log| log.destroy_calls += 1);
    drop(Box::from_raw(handle as *mut StubTagger));
}

unsafe extern "C" fn stub_sparse_tonode2(
    handle: MecabHandle,
    text: *const c_char,
    length: usize,
) -> *const MecabNodeRaw {
    record(|log| log.parse_calls += 1);
    let tagger = stub_state(handle);
    let input = node_bytes(text, length);
    if input.contains(&0x07) {
        tagger.fail("invalid character 0x07 in input");
        return ptr::null();
    }
    tagger.build_lattice(input, 0)
}

unsafe extern "C" fn stub_sparse_tostr2(
    handle: MecabHandle,
    text: *const c_char,
    length: usize,
) -> *const c_char {
    if stub_sparse_tonode2(handle, text, length).is_null() {
        return ptr::null();
    }
    let tagger = stub_state(handle);
    tagger.output = CString::new(tagger.render_lattice()).unwrap_or_default();
    tagger.output.as_ptr()
}

unsafe extern "C" fn stub_format_node(
    handle: MecabHandle,
    node: *const MecabNodeRaw,
) -> *const c_char {
    record(|log| log.format_calls += 1);
    let tagger = stub_state(handle);
    let node = &*node;
    let Some(template) = tagger.template_for(node.stat) else {
        tagger.fail("no format is specified");
        return ptr::null();
    };
    tagger.output = CString::new(render_template(&template, node)).unwrap_or_default();
    tagger.output.as_ptr()
}

unsafe extern "C" fn stub_nbest_init2(
    handle: MecabHandle,
    text: *const c_char,
    length: usize,
) -> c_int {
    let tagger = stub_state(handle);
    let input = node_bytes(text, length);
    if input.contains(&0x07) {
        tagger.fail("invalid character 0x07 in input");
        return 0;
    }
    tagger.nbest_sentence = input.to_vec();
    tagger.nbest_served = 0;
    1
}

unsafe extern "C" fn stub_nbest_next_tonode(handle: MecabHandle) -> *const MecabNodeRaw {
    let tagger = stub_state(handle);
    if tagger.nbest_served >= STUB_NBEST_PATHS {
        return ptr::null();
    }
    let offset = tagger.nbest_served as i64 * STUB_NBEST_COST_STEP;
    tagger.nbest_served += 1;
    record(|log| log.parse_calls += 1);
    let sentence = tagger.nbest_sentence.clone();
    tagger.build_lattice(&sentence, offset)
}

unsafe extern "C" fn stub_nbest_sparse_tostr2(
    handle: MecabHandle,
    n: usize,
    text: *const c_char,
    length: usize,
) -> *const c_char {
    if stub_nbest_init2(handle, text, length) == 0 {
        return ptr::null();
    }
    let mut output = String::new();
    for _ in 0..n {
        if stub_nbest_next_tonode(handle).is_null() {
            break;
        }
        output.push_str(&stub_state(handle).render_lattice());
    }
    let tagger = stub_state(handle);
    tagger.output = CString::new(output).unwrap_or_default();
    tagger.output.as_ptr()
}

unsafe extern "C" fn stub_dictionary_info(handle: MecabHandle) -> *const MecabDictionaryInfoRaw {
    let tagger = stub_state(handle);
    &*tagger.dictionaries[0]
}

#[cfg(test)]
mod stub_tests {
    use super::render_template;
    use crate::native::MecabNodeRaw;
    use std::ffi::CString;

    #[test]
    fn template_renderer_expands_directives_and_escapes() {
        let sentence = b"  hello";
        let feature = CString::new("NOUN,common,*").unwrap();
        let mut prev = MecabNodeRaw::zeroed();
        prev.cost = 5;
        let mut node = MecabNodeRaw::zeroed();
        node.surface = sentence[2..].as_ptr().cast();
        node.length = 5;
        node.rlength = 7;
        node.feature = feature.as_ptr();
        node.wcost = 100;
        node.cost = 115;
        node.prev = &mut prev;

        assert_eq!(render_template("%m\\n", &node), "hello\n");
        assert_eq!(render_template("[%M]", &node), "[  hello]");
        assert_eq!(render_template("%f[1]\\t%H", &node), "common\tNOUN,common,*");
        assert_eq!(render_template("%c %pC 100%%", &node), "100 10 100%");
    }
}
