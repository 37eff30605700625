#![deny(missing_docs)]

//! Rust bindings for the MeCab C API.
//!
//! `libmecab` is loaded at runtime, so nothing links against it at build
//! time. The crate covers three things: encoding options into MeCab's
//! argument vector, walking the node chains a parse produces, and rendering
//! nodes with MeCab's own template engine.
//!
//! ## Quick Start
//! ```no_run
//! use mecab_rs::{Tagger, TaggerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tagger = Tagger::new(&TaggerConfig::default())?;
//!     let lattice = tagger.parse("すもももももももものうち")?;
//!     for node in lattice.morphemes() {
//!         println!("{}\t{}", node.surface(), node.feature());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lifetimes
//! A [`Lattice`] and its [`Node`]s point into memory owned by the
//! [`Tagger`]. They stay valid until the tagger parses again or is released.
//! [`Tagger::parse`] and [`Tagger::release`] take `&mut self`, so safe code
//! cannot hold a view across either event.
//!
//! Node fields are read without any liveness check. [`Node::as_ptr`] hands
//! out the raw `mecab_node_t` pointer, and dereferencing it after a re-parse
//! or release is undefined behaviour. This is a deliberate trade for zero
//! per-access overhead, not a bug to be fixed.
//!
//! When results must outlive the tagger, copy them with
//! [`Lattice::to_owned_result`] or [`Node::to_owned_chain`]. A
//! [`ClonedResult`] duplicates every node up to EOS, roughly doubling the
//! memory of the chain, and is `Send + Sync`.
//!
//! ```no_run
//! use mecab_rs::{ClonedResult, Options, Tagger};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tagger = Tagger::from_options(Options::new())?;
//!     let kept: ClonedResult = tagger.parse("今日は晴れ")?.to_owned_result();
//!     tagger.release();
//!     for node in kept.morphemes() {
//!         println!("{}", node.surface());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threads
//! [`MecabLibrary`] and [`ClonedResult`] are `Send + Sync`. A [`Tagger`] is
//! only `Send`: MeCab's parse buffers are not reentrant, so use one tagger
//! per thread.
//!
//! ## Formatting
//! Set `output_format_type` or any of `node_format`, `unk_format`,
//! `bos_format`, `eos_format` and `eon_format` at construction, then call
//! [`Node::format`]. Template syntax is MeCab's and passes through untouched.
//! A tagger without custom formatting renders MeCab's default
//! `surface\tfeature` line.
//!
//! ## Environment Variables
//! - `MECAB_LIBRARY_PATH`: explicit dynamic library path.
//! - `MECABRC`: read by MeCab itself to locate its resource file.

mod config;
mod constants;
mod discovery;
mod error;
mod model;
mod native;
mod options;
mod runtime;
mod types;

pub use constants::*;
pub use error::{MecabError, Result};
pub use model::{ClonedNode, ClonedResult, DictionaryInfo, DictionaryKind, NodeStat};
pub use options::{
    encode_args, is_boolean_flag, normalize_key, OptionValue, Options, ALLOCATE_SENTENCE_FLAG,
    BOOLEAN_FLAGS,
};
pub use runtime::{Lattice, MecabLibrary, Node, Nodes, Tagger};
pub use types::{FormatTemplates, TaggerConfig};

#[cfg(test)]
mod test_support;
