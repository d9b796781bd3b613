//! Errors raised while configuring or running the tokenizer.

use thiserror::Error;
use tools::mem::MemoryLimitExceededError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unknown character encoding label `{label}`")]
    UnknownLabel { label: String },
    #[error("character encoding `{name}` is not ASCII-compatible")]
    NonAsciiCompatible { name: &'static str },
}

/// A start tag whose effect on tokenization depends on tree-construction
/// state the tokenizer does not model.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "ambiguous parsing context: it is unclear whether `<{tag_name}>` switches the text parsing mode here"
)]
pub struct ParsingAmbiguityError {
    pub tag_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TokenizerError {
    #[error(transparent)]
    MemoryLimitExceeded(#[from] MemoryLimitExceededError),
    #[error(transparent)]
    ParsingAmbiguity(#[from] ParsingAmbiguityError),
}
