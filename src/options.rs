//! Encoding of option sets into the argument vector `mecab_new` expects.
//!
//! Keys are accepted in underscore style (`node_format`) and normalised to
//! MeCab's long-flag style (`--node-format`). Keys listed in
//! [`BOOLEAN_FLAGS`] are presence-only: they are emitted bare whatever value
//! was supplied. Every other key becomes `--key=value`.
//!
//! `--allocate-sentence` is always emitted. Borrowed node chains point into
//! the sentence buffer, and without this flag that buffer is the caller's
//! input string, which the binding frees right after `parse` returns.
//!
//! MeCab does not care about the order of distinct flags, so the order of
//! the encoded vector is not part of the contract. Compare encoded vectors
//! as sets.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{MecabError, Result};

/// Flag that keeps the analyzed sentence alive inside MeCab.
pub const ALLOCATE_SENTENCE_FLAG: &str = "allocate-sentence";

/// Flags that take no value on MeCab's command line.
pub const BOOLEAN_FLAGS: [&str; 5] = [
    "all-morphs",
    "partial",
    ALLOCATE_SENTENCE_FLAG,
    "version",
    "help",
];

/// A single option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Boolean value. Rendered as `true`/`false` for non-flag keys.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Unsigned integer value too large for [`OptionValue::Int`].
    UInt(u64),
    /// Floating point value. Must be finite.
    Float(f64),
    /// String value. Must not contain `NUL`.
    Str(String),
}

impl OptionValue {
    fn render(&self, name: &str) -> Result<String> {
        match self {
            OptionValue::Bool(value) => Ok(value.to_string()),
            OptionValue::Int(value) => Ok(value.to_string()),
            OptionValue::UInt(value) => Ok(value.to_string()),
            OptionValue::Float(value) if value.is_finite() => Ok(value.to_string()),
            OptionValue::Float(value) => Err(MecabError::Configuration(format!(
                "option `{name}` has non-finite value {value}"
            ))),
            OptionValue::Str(value) if value.contains('\0') => Err(MecabError::Configuration(
                format!("option `{name}` contains a NUL byte"),
            )),
            OptionValue::Str(value) => Ok(value.clone()),
        }
    }

    fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(value) => Ok(OptionValue::Bool(*value)),
            Value::String(value) => Ok(OptionValue::Str(value.clone())),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Ok(OptionValue::Int(value))
                } else if let Some(value) = number.as_u64() {
                    Ok(OptionValue::UInt(value))
                } else if let Some(value) = number.as_f64() {
                    Ok(OptionValue::Float(value))
                } else {
                    Err(MecabError::Configuration(format!(
                        "option `{key}` has an unrepresentable number {number}"
                    )))
                }
            }
            Value::Null => Err(unsupported_type(key, "null")),
            Value::Array(_) => Err(unsupported_type(key, "array")),
            Value::Object(_) => Err(unsupported_type(key, "object")),
        }
    }
}

fn unsupported_type(key: &str, kind: &str) -> MecabError {
    MecabError::Configuration(format!(
        "option `{key}` has unsupported value type {kind}; expected string, number or boolean"
    ))
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::UInt(value) => write!(f, "{value}"),
            OptionValue::Float(value) => write!(f, "{value}"),
            OptionValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(OptionValue::UInt(value), OptionValue::Int)
    }
}

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::Float(value.into())
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<&Path> for OptionValue {
    fn from(value: &Path) -> Self {
        OptionValue::Str(value.to_string_lossy().to_string())
    }
}

impl From<PathBuf> for OptionValue {
    fn from(value: PathBuf) -> Self {
        OptionValue::from(value.as_path())
    }
}

/// Caller-supplied option set.
///
/// Entries are kept as supplied and validated by [`encode_args`]. When two
/// keys normalise to the same flag, the one inserted last wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder-style [`Self::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Appends every entry of `other`, which then takes precedence.
    pub fn extend(&mut self, other: &Options) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Returns the effective value for `key`, compared after normalisation.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        let wanted = normalize_key(key).ok()?;
        self.entries
            .iter()
            .rev()
            .find(|(candidate, _)| {
                normalize_key(candidate).ok().as_deref() == Some(wanted.as_str())
            })
            .map(|(_, value)| value)
    }

    /// Number of raw entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no option was supplied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates raw entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Builds an option set from a JSON object.
    ///
    /// Strings, numbers and booleans are accepted. `null`, arrays and nested
    /// objects are rejected with [`MecabError::Configuration`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            MecabError::Configuration("option set must be a JSON object".to_string())
        })?;

        let mut options = Options::new();
        for (key, value) in object {
            options.insert(key.clone(), OptionValue::from_json(key, value)?);
        }
        Ok(options)
    }

    /// Shorthand for [`encode_args`].
    pub fn encode(&self) -> Result<Vec<String>> {
        encode_args(self)
    }
}

fn separator_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[_\s]+"))
        .as_ref()
        .map_err(|error| MecabError::Configuration(format!("invalid separator pattern: {error}")))
}

/// Normalises an option key to MeCab's flag name (without the leading `--`).
///
/// Leading dashes are dropped, runs of underscores or whitespace become one
/// dash and the result is lowercased.
pub fn normalize_key(key: &str) -> Result<String> {
    let trimmed = key.trim().trim_start_matches('-');
    let normalized = separator_pattern()?
        .replace_all(trimmed, "-")
        .to_ascii_lowercase();

    if normalized.is_empty() {
        return Err(MecabError::Configuration(format!(
            "option key `{key}` is empty after normalisation"
        )));
    }
    if normalized.contains('=') || normalized.contains('\0') {
        return Err(MecabError::Configuration(format!(
            "option key `{key}` contains a reserved character"
        )));
    }
    Ok(normalized)
}

/// Returns whether `name` (already normalised) is a presence-only flag.
pub fn is_boolean_flag(name: &str) -> bool {
    BOOLEAN_FLAGS.contains(&name)
}

/// Encodes an option set into MeCab command-line tokens.
///
/// The program name is not included. `--allocate-sentence` is always
/// present, even when the caller set it to `false`.
pub fn encode_args(options: &Options) -> Result<Vec<String>> {
    let mut flags: BTreeMap<String, Option<String>> = BTreeMap::new();

    for (key, value) in options.iter() {
        let name = normalize_key(key)?;
        if is_boolean_flag(&name) {
            if name == ALLOCATE_SENTENCE_FLAG && matches!(value, OptionValue::Bool(false)) {
                debug!("allocate-sentence cannot be disabled; overriding caller value");
            }
            flags.insert(name, None);
        } else {
            let rendered = value.render(&name)?;
            flags.insert(name, Some(rendered));
        }
    }
    flags.insert(ALLOCATE_SENTENCE_FLAG.to_string(), None);

    Ok(flags
        .into_iter()
        .map(|(name, value)| match value {
            Some(value) => format!("--{name}={value}"),
            None => format!("--{name}"),
        })
        .collect())
}
