//! Incremental selector matching over the open-element stack.
//!
//! Each complex selector is matched left to right. When a compound matches an
//! element, the state "next compound pending" is handed on: to the element's
//! children for `>`, or to all of its descendants for a descendant
//! combinator. An element therefore only has to be checked against the states
//! its ancestors produced, and nothing after the start tag is ever needed.

use std::mem::size_of;

use html::StartTagToken;
use tools::mem::{MemoryLimitExceededError, SharedMemoryLimiter};

use crate::syntax::{
    AttributeMatcher, AttributeOperator, Combinator, CompoundSelector, Selector, SimpleSelector,
};

/// An element as seen by the matcher.
pub trait MatchTarget {
    /// Tag name in any case.
    fn local_name(&self) -> &[u8];
    /// Value of the attribute named `name` (lowercase), if present.
    fn attribute_value(&self, name: &str) -> Option<&[u8]>;
}

impl MatchTarget for StartTagToken<'_> {
    fn local_name(&self) -> &[u8] {
        self.name
    }

    fn attribute_value(&self, name: &str) -> Option<&[u8]> {
        self.attribute(name.as_bytes()).map(|attr| attr.value)
    }
}

/// Indices of the selectors an element matched, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchSet {
    ids: Vec<usize>,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ids.iter().copied()
    }

    fn insert(&mut self, id: usize) {
        if let Err(at) = self.ids.binary_search(&id) {
            self.ids.insert(at, id);
        }
    }
}

/// One alternative of one registered selector.
#[derive(Debug)]
struct Program {
    selector: usize,
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
}

/// `compounds[..next]` matched on ancestors; `compounds[next]` is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PartialMatch {
    program: usize,
    next: usize,
}

#[derive(Debug)]
struct Frame {
    /// Length of `active` before this element added descendant states.
    active_len: usize,
    /// States that only apply to direct children.
    child_states: Vec<PartialMatch>,
    matched: MatchSet,
    charged: usize,
}

pub struct SelectorMatcher {
    programs: Vec<Program>,
    /// Descendant states produced by open elements, innermost last.
    active: Vec<PartialMatch>,
    frames: Vec<Frame>,
    /// Per selector: number of open elements it matched.
    open_matches: Vec<u32>,
    limiter: SharedMemoryLimiter,
}

impl SelectorMatcher {
    pub fn new(selectors: &[Selector], limiter: SharedMemoryLimiter) -> Self {
        let programs = selectors
            .iter()
            .enumerate()
            .flat_map(|(selector, parsed)| {
                parsed.alternatives().iter().map(move |complex| Program {
                    selector,
                    compounds: complex.compounds.clone(),
                    combinators: complex.combinators.clone(),
                })
            })
            .collect();
        Self {
            programs,
            active: Vec::new(),
            frames: Vec::new(),
            open_matches: vec![0; selectors.len()],
            limiter,
        }
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether some open element matched selector `id`.
    pub fn is_within(&self, id: usize) -> bool {
        self.open_matches.get(id).is_some_and(|&count| count > 0)
    }

    /// Match a start tag. Elements that can have content stay open until
    /// [`SelectorMatcher::end_element`].
    pub fn start_element(
        &mut self,
        target: &impl MatchTarget,
        can_have_content: bool,
    ) -> Result<MatchSet, MemoryLimitExceededError> {
        let mut matched = MatchSet::default();
        let mut child_states = Vec::new();
        let mut descendant_states = Vec::new();

        let initial = (0..self.programs.len()).map(|program| PartialMatch { program, next: 0 });
        let from_parent = self
            .frames
            .last()
            .map(|frame| frame.child_states.as_slice())
            .unwrap_or_default();
        let candidates = initial
            .chain(from_parent.iter().copied())
            .chain(self.active.iter().copied());

        for state in candidates {
            let program = &self.programs[state.program];
            if !matches_compound(&program.compounds[state.next], target) {
                continue;
            }
            if state.next + 1 == program.compounds.len() {
                matched.insert(program.selector);
                continue;
            }
            let advanced = PartialMatch {
                program: state.program,
                next: state.next + 1,
            };
            match program.combinators[state.next] {
                Combinator::Child => {
                    if !child_states.contains(&advanced) {
                        child_states.push(advanced);
                    }
                }
                Combinator::Descendant => {
                    if !self.active.contains(&advanced) && !descendant_states.contains(&advanced) {
                        descendant_states.push(advanced);
                    }
                }
            }
        }

        if !can_have_content {
            return Ok(matched);
        }

        let charged = size_of::<Frame>()
            + (child_states.len() + descendant_states.len()) * size_of::<PartialMatch>()
            + matched.len() * size_of::<usize>();
        self.limiter.borrow_mut().increase_usage(charged)?;

        for id in matched.iter() {
            self.open_matches[id] += 1;
        }
        let active_len = self.active.len();
        self.active.extend(descendant_states);
        self.frames.push(Frame {
            active_len,
            child_states,
            matched: matched.clone(),
            charged,
        });
        Ok(matched)
    }

    /// Close the innermost open element. Returns `false` when none is open.
    pub fn end_element(&mut self) -> bool {
        let Some(frame) = self.frames.pop() else {
            return false;
        };
        self.active.truncate(frame.active_len);
        for id in frame.matched.iter() {
            self.open_matches[id] -= 1;
        }
        self.limiter.borrow_mut().decrease_usage(frame.charged);
        true
    }
}

impl Drop for SelectorMatcher {
    fn drop(&mut self) {
        let charged: usize = self.frames.iter().map(|frame| frame.charged).sum();
        self.limiter.borrow_mut().decrease_usage(charged);
    }
}

fn matches_compound(compound: &CompoundSelector, target: &impl MatchTarget) -> bool {
    compound.parts.iter().all(|part| matches_simple(part, target))
}

fn matches_simple(part: &SimpleSelector, target: &impl MatchTarget) -> bool {
    match part {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(name) => target.local_name().eq_ignore_ascii_case(name.as_bytes()),
        SimpleSelector::Id(id) => target.attribute_value("id") == Some(id.as_bytes()),
        SimpleSelector::Class(class) => target
            .attribute_value("class")
            .is_some_and(|value| split_whitespace(value).any(|word| word == class.as_bytes())),
        SimpleSelector::Attribute(attr) => match target.attribute_value(&attr.name) {
            None => false,
            Some(value) => attr
                .matcher
                .as_ref()
                .is_none_or(|matcher| matches_attribute_value(matcher, value)),
        },
    }
}

fn split_whitespace(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value
        .split(|&b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C'))
        .filter(|word| !word.is_empty())
}

fn matches_attribute_value(matcher: &AttributeMatcher, value: &[u8]) -> bool {
    let expected = matcher.value.as_bytes();
    let eq = |a: &[u8], b: &[u8]| {
        if matcher.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };
    match matcher.operator {
        AttributeOperator::Equals => eq(value, expected),
        AttributeOperator::Includes => {
            !expected.is_empty()
                && !expected.iter().any(u8::is_ascii_whitespace)
                && split_whitespace(value).any(|word| eq(word, expected))
        }
        AttributeOperator::DashMatch => {
            eq(value, expected)
                || (value.len() > expected.len()
                    && value[expected.len()] == b'-'
                    && eq(&value[..expected.len()], expected))
        }
        AttributeOperator::Prefix => {
            !expected.is_empty()
                && value.len() >= expected.len()
                && eq(&value[..expected.len()], expected)
        }
        AttributeOperator::Suffix => {
            !expected.is_empty()
                && value.len() >= expected.len()
                && eq(&value[value.len() - expected.len()..], expected)
        }
        AttributeOperator::Substring => {
            !expected.is_empty()
                && value.len() >= expected.len()
                && value.windows(expected.len()).any(|window| eq(window, expected))
        }
    }
}
