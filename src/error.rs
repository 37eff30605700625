use thiserror::Error;

/// Error type returned by mecab-rs public APIs.
#[derive(Debug, Error)]
pub enum MecabError {
    /// Dynamic library could not be loaded.
    #[error("failed to load library: {0}")]
    LibraryLoad(String),
    /// Required symbol could not be resolved from the library.
    #[error("failed to load symbol: {0}")]
    SymbolLoad(String),
    /// Rust string contained an interior `NUL` byte for C interop.
    #[error("string contains NUL byte: {0}")]
    NulByte(#[from] std::ffi::NulError),
    /// Option set was malformed. Raised before any call into MeCab.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// MeCab rejected the argument vector. Carries MeCab's message verbatim.
    #[error("failed to construct tagger: {0}")]
    Construction(String),
    /// MeCab failed on one input. The tagger stays usable.
    #[error("failed to parse input: {0}")]
    Parse(String),
    /// Template or formatting-context mismatch while rendering a node.
    #[error("failed to format node: {0}")]
    Format(String),
    /// Argument rejected before reaching MeCab.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Any other error reported by the MeCab C API.
    #[error("mecab api error: {0}")]
    Api(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MecabError>;
