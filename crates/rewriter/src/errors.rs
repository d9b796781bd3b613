use std::error::Error as StdError;

use html::{EncodingError, ParsingAmbiguityError, TokenizerError};
use thiserror::Error;
use tools::mem::MemoryLimitExceededError;

/// Errors from [`crate::RewriterBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(
        "preallocated parsing buffer of {preallocated} bytes exceeds the memory limit of {max} bytes"
    )]
    PreallocationExceedsLimit { preallocated: usize, max: usize },
}

/// Errors returned by [`crate::HtmlRewriter::write`] and
/// [`crate::HtmlRewriter::end`].
#[derive(Debug, Error)]
pub enum RewritingError {
    #[error(transparent)]
    MemoryLimitExceeded(#[from] MemoryLimitExceededError),
    #[error(transparent)]
    ParsingAmbiguity(#[from] ParsingAmbiguityError),
    #[error("a content handler stopped the rewriter")]
    Stopped,
    #[error("streaming content handler failed: {0}")]
    ContentHandler(Box<dyn StdError + Send + Sync>),
    #[error("the rewriter has already failed or been stopped")]
    Poisoned,
    #[error("the rewriter has already ended")]
    Ended,
}

impl From<TokenizerError> for RewritingError {
    fn from(err: TokenizerError) -> Self {
        match err {
            TokenizerError::MemoryLimitExceeded(err) => Self::MemoryLimitExceeded(err),
            TokenizerError::ParsingAmbiguity(err) => Self::ParsingAmbiguity(err),
        }
    }
}

/// A mutation request that would produce malformed or unencodable markup.
/// The unit is left unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InvalidMutationError {
    #[error("tag name can't be empty")]
    EmptyTagName,
    #[error("tag name must start with an ASCII letter")]
    InvalidTagNameFirstCharacter,
    #[error("`{0}` is not allowed in a tag name")]
    ForbiddenTagNameCharacter(char),
    #[error("attribute name can't be empty")]
    EmptyAttributeName,
    #[error("`{0}` is not allowed in an attribute name")]
    ForbiddenAttributeNameCharacter(char),
    #[error("comment text can't contain `-->`")]
    CommentClosingSequence,
    #[error("the value contains characters the document encoding can't represent")]
    UnencodableCharacter,
    #[error("the element can't have content and never gets an end tag")]
    NoEndTag,
}

/// Errors from [`crate::rewrite_str`].
#[derive(Debug, Error)]
pub enum RewriteStrError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Rewriting(#[from] RewritingError),
}
