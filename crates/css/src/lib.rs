//! CSS selectors for the streaming rewriter.

pub mod matching;
pub mod syntax;

pub use matching::{MatchSet, MatchTarget, SelectorMatcher};
pub use syntax::{
    AttributeMatcher, AttributeOperator, AttributeSelector, Combinator, ComplexSelector,
    CompoundSelector, Selector, SelectorError, SimpleSelector,
};
