//! Constants mirrored from `mecab.h`.

/// Node stat: normal node defined in the dictionary.
pub const MECAB_NOR_NODE: u8 = 0;
/// Node stat: unknown node not defined in the dictionary.
pub const MECAB_UNK_NODE: u8 = 1;
/// Node stat: virtual node representing a beginning of the sentence.
pub const MECAB_BOS_NODE: u8 = 2;
/// Node stat: virtual node representing an end of the sentence.
pub const MECAB_EOS_NODE: u8 = 3;
/// Node stat: virtual node representing an end of the N-best enumeration.
pub const MECAB_EON_NODE: u8 = 4;

/// Dictionary type: system dictionary.
pub const MECAB_SYS_DIC: i32 = 0;
/// Dictionary type: user dictionary.
pub const MECAB_USR_DIC: i32 = 1;
/// Dictionary type: unknown word dictionary.
pub const MECAB_UNK_DIC: i32 = 2;

/// Lattice request: one best result is obtained (default mode).
pub const MECAB_ONE_BEST: i32 = 1;
/// Lattice request: set this flag if you want to obtain N best results.
pub const MECAB_NBEST: i32 = 2;
/// Lattice request: partial parsing with boundary constraints.
pub const MECAB_PARTIAL: i32 = 4;
/// Lattice request: compute marginal probabilities.
pub const MECAB_MARGINAL_PROB: i32 = 8;
/// Lattice request: output alternative results.
pub const MECAB_ALTERNATIVE: i32 = 16;
/// Lattice request: output all morphs.
pub const MECAB_ALL_MORPHS: i32 = 32;
/// Lattice request: copy the input sentence into lattice-owned memory.
pub const MECAB_ALLOCATE_SENTENCE: i32 = 64;

/// Boundary constraint: the position is undetermined.
pub const MECAB_ANY_BOUNDARY: i32 = 0;
/// Boundary constraint: the position is a token boundary.
pub const MECAB_TOKEN_BOUNDARY: i32 = 1;
/// Boundary constraint: the position is inside a token.
pub const MECAB_INSIDE_TOKEN: i32 = 2;

/// Program name passed as `argv[0]` to `mecab_new`.
pub(crate) const MECAB_PROGRAM_NAME: &str = "mecab";
