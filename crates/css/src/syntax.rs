//! Selector syntax: parsing a selector string into an immutable program.
//!
//! Supported: `*`, type, `.class`, `#id`, attribute predicates with every CSS
//! operator and the `i`/`s` flags, compound selectors, selector lists, and the
//! descendant and child combinators. Anything that would need more than the
//! open-element stack to decide (pseudo-classes, sibling combinators) is
//! rejected when parsing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    EmptySelector,
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("unexpected token `{0}` in selector")]
    UnexpectedToken(char),
    #[error("combinator without a selector on both sides")]
    DanglingCombinator,
    #[error("unsupported combinator `{0}`")]
    UnsupportedCombinator(char),
    #[error("unsupported pseudo-class or pseudo-element")]
    UnsupportedPseudoClassOrElement,
    #[error("namespaced selectors are not supported")]
    NamespacedSelector,
    #[error("invalid class name")]
    InvalidClassName,
    #[error("invalid id")]
    InvalidId,
    #[error("missing attribute name")]
    MissingAttributeName,
    #[error("unexpected token `{0}` in attribute selector")]
    UnexpectedTokenInAttribute(char),
    #[error("invalid attribute value")]
    InvalidAttributeValue,
    #[error("invalid escape sequence")]
    InvalidEscape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `[a=v]`
    Equals,
    /// `[a~=v]`: `v` is one of the whitespace-separated words.
    Includes,
    /// `[a|=v]`: exactly `v` or starts with `v-`.
    DashMatch,
    /// `[a^=v]`
    Prefix,
    /// `[a$=v]`
    Suffix,
    /// `[a*=v]`
    Substring,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMatcher {
    pub operator: AttributeOperator,
    pub value: String,
    pub case_insensitive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Lowercase; HTML attribute names are case-insensitive.
    pub name: String,
    /// `None` for presence tests (`[a]`).
    pub matcher: Option<AttributeMatcher>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    /// Lowercase tag name.
    Type(String),
    Id(String),
    Class(String),
    Attribute(AttributeSelector),
}

/// Simple selectors that all have to match the same element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompoundSelector {
    pub parts: Vec<SimpleSelector>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compounds from the outermost ancestor to the subject element;
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

#[derive(Debug)]
struct SelectorInner {
    source: String,
    alternatives: Vec<ComplexSelector>,
}

/// A parsed selector list. Cheap to clone and shareable across threads and
/// rewriter instances.
#[derive(Clone, Debug)]
pub struct Selector(Arc<SelectorInner>);

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let alternatives = Parser::new(input).parse_selector_list()?;
        Ok(Self(Arc::new(SelectorInner {
            source: input.trim().to_string(),
            alternatives,
        })))
    }

    /// The comma-separated alternatives; an element matches when any does.
    pub fn alternatives(&self) -> &[ComplexSelector] {
        &self.0.alternatives
    }

    pub fn as_str(&self) -> &str {
        &self.0.source
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.0.alternatives == other.0.alternatives
    }
}

impl Eq for Selector {}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.source)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Returns whether any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_selector_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::EmptySelector);
        }
        let mut alternatives = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            self.skip_whitespace();
            if self.peek().is_none() {
                return Err(SelectorError::UnexpectedEnd);
            }
            alternatives.push(self.parse_complex()?);
        }
        Ok(alternatives)
    }

    /// Parses up to (not including) a `,` or the end of input.
    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        match self.peek() {
            Some('>' | '+' | '~') => return Err(SelectorError::DanglingCombinator),
            Some(',') => return Err(SelectorError::UnexpectedToken(',')),
            _ => {}
        }
        compounds.push(self.parse_compound()?);

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(c @ ('+' | '~')) => return Err(SelectorError::UnsupportedCombinator(c)),
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(SelectorError::UnexpectedToken(c)),
            };
            match self.peek() {
                None | Some(',' | '>' | '+' | '~') => return Err(SelectorError::DanglingCombinator),
                _ => {}
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut parts = Vec::new();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                if self.peek() == Some('|') {
                    return Err(SelectorError::NamespacedSelector);
                }
                parts.push(SimpleSelector::Universal);
            }
            Some('|') => return Err(SelectorError::NamespacedSelector),
            Some(c) if self.starts_identifier() || c == '\\' => {
                let name = self.parse_identifier()?;
                if self.peek() == Some('|') {
                    return Err(SelectorError::NamespacedSelector);
                }
                parts.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    if !self.starts_identifier() {
                        return Err(SelectorError::InvalidId);
                    }
                    parts.push(SimpleSelector::Id(self.parse_identifier()?));
                }
                Some('.') => {
                    self.pos += 1;
                    if !self.starts_identifier() {
                        return Err(SelectorError::InvalidClassName);
                    }
                    parts.push(SimpleSelector::Class(self.parse_identifier()?));
                }
                Some('[') => {
                    self.pos += 1;
                    parts.push(SimpleSelector::Attribute(self.parse_attribute()?));
                }
                Some(':') => return Err(SelectorError::UnsupportedPseudoClassOrElement),
                _ => break,
            }
        }

        if parts.is_empty() {
            return Err(match self.peek() {
                Some(c) => SelectorError::UnexpectedToken(c),
                None => SelectorError::UnexpectedEnd,
            });
        }
        Ok(CompoundSelector { parts })
    }

    /// Whether an identifier starts at the current position.
    fn starts_identifier(&self) -> bool {
        let starts_name = |c: Option<char>, next: Option<char>| match c {
            Some('\\') => next.is_some_and(|n| n != '\n'),
            Some(c) => is_name_start(c),
            None => false,
        };
        match self.peek() {
            Some('-') => self.peek_at(1) == Some('-') || starts_name(self.peek_at(1), self.peek_at(2)),
            c => starts_name(c, self.peek_at(1)),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                out.push(self.parse_escape()?);
            } else if is_name_char(c) {
                self.pos += 1;
                out.push(c);
            } else {
                break;
            }
        }
        Ok(out)
    }

    /// After a backslash.
    fn parse_escape(&mut self) -> Result<char, SelectorError> {
        let c = match self.bump() {
            None | Some('\n') => return Err(SelectorError::InvalidEscape),
            Some(c) => c,
        };
        let Some(first) = c.to_digit(16) else {
            return Ok(c);
        };
        let mut code = first;
        let mut digits = 1;
        while digits < 6 {
            let Some(d) = self.peek().and_then(|c| c.to_digit(16)) else {
                break;
            };
            code = code * 16 + d;
            digits += 1;
            self.pos += 1;
        }
        if self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        Ok(match char::from_u32(code) {
            Some('\0') | None => char::REPLACEMENT_CHARACTER,
            Some(c) => c,
        })
    }

    /// After `[`.
    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        match self.peek() {
            None => return Err(SelectorError::UnexpectedEnd),
            Some('*' | '|') => return Err(SelectorError::NamespacedSelector),
            Some(']') => return Err(SelectorError::MissingAttributeName),
            _ if !self.starts_identifier() => return Err(SelectorError::MissingAttributeName),
            _ => {}
        }
        let name = self.parse_identifier()?.to_ascii_lowercase();
        self.skip_whitespace();

        let operator = match self.bump() {
            None => return Err(SelectorError::UnexpectedEnd),
            Some(']') => {
                return Ok(AttributeSelector {
                    name,
                    matcher: None,
                });
            }
            Some('|') if self.peek() != Some('=') => return Err(SelectorError::NamespacedSelector),
            Some('=') => AttributeOperator::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.bump() != Some('=') {
                    return Err(SelectorError::UnexpectedTokenInAttribute(c));
                }
                match c {
                    '~' => AttributeOperator::Includes,
                    '|' => AttributeOperator::DashMatch,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    _ => AttributeOperator::Substring,
                }
            }
            Some(c) => return Err(SelectorError::UnexpectedTokenInAttribute(c)),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            None => return Err(SelectorError::UnexpectedEnd),
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote)?
            }
            Some(_) if self.starts_identifier() => self.parse_identifier()?,
            Some(_) => return Err(SelectorError::InvalidAttributeValue),
        };

        let had_whitespace = self.skip_whitespace();
        let mut case_insensitive = false;
        match self.peek() {
            None => return Err(SelectorError::UnexpectedEnd),
            Some(']') => {}
            Some(c) if had_whitespace && c.is_ascii_alphabetic() => {
                match self.parse_identifier()?.to_ascii_lowercase().as_str() {
                    "i" => case_insensitive = true,
                    "s" => {}
                    _ => return Err(SelectorError::UnexpectedTokenInAttribute(c)),
                }
                self.skip_whitespace();
            }
            Some(c) => return Err(SelectorError::UnexpectedTokenInAttribute(c)),
        }
        match self.bump() {
            Some(']') => {}
            Some(c) => return Err(SelectorError::UnexpectedTokenInAttribute(c)),
            None => return Err(SelectorError::UnexpectedEnd),
        }

        Ok(AttributeSelector {
            name,
            matcher: Some(AttributeMatcher {
                operator,
                value,
                case_insensitive,
            }),
        })
    }

    /// After the opening quote.
    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorError::UnexpectedEnd),
                Some(c) if c == quote => return Ok(out),
                Some('\n') => return Err(SelectorError::InvalidAttributeValue),
                Some('\\') => {
                    if self.peek() == Some('\n') {
                        self.pos += 1;
                    } else {
                        out.push(self.parse_escape()?);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> ComplexSelector {
        let selector = Selector::parse(input).unwrap();
        assert_eq!(selector.alternatives().len(), 1);
        selector.alternatives()[0].clone()
    }

    fn parts(input: &str) -> Vec<SimpleSelector> {
        let complex = single(input);
        assert_eq!(complex.compounds.len(), 1);
        complex.compounds[0].parts.clone()
    }

    #[test]
    fn simple_selectors() {
        assert_eq!(parts("*"), vec![SimpleSelector::Universal]);
        assert_eq!(parts("DIV"), vec![SimpleSelector::Type("div".into())]);
        assert_eq!(parts("#Main"), vec![SimpleSelector::Id("Main".into())]);
        assert_eq!(parts(".note"), vec![SimpleSelector::Class("note".into())]);
        assert_eq!(
            parts("p.a#b"),
            vec![
                SimpleSelector::Type("p".into()),
                SimpleSelector::Class("a".into()),
                SimpleSelector::Id("b".into()),
            ]
        );
    }

    #[test]
    fn attribute_selectors() {
        let attr = |input: &str| match &parts(input)[..] {
            [SimpleSelector::Attribute(attr)] => attr.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(
            attr("[HREF]"),
            AttributeSelector {
                name: "href".into(),
                matcher: None,
            }
        );
        let m = attr("[ lang |= \"en\" i ]").matcher.unwrap();
        assert_eq!(m.operator, AttributeOperator::DashMatch);
        assert_eq!(m.value, "en");
        assert!(m.case_insensitive);
        for (input, op) in [
            ("[a=v]", AttributeOperator::Equals),
            ("[a~=v]", AttributeOperator::Includes),
            ("[a^='v']", AttributeOperator::Prefix),
            ("[a$=v s]", AttributeOperator::Suffix),
            ("[a*=v]", AttributeOperator::Substring),
        ] {
            let m = attr(input).matcher.unwrap();
            assert_eq!(m.operator, op, "{input}");
            assert!(!m.case_insensitive, "{input}");
        }
    }

    #[test]
    fn escapes_in_identifiers_and_strings() {
        assert_eq!(parts(".a\\.b"), vec![SimpleSelector::Class("a.b".into())]);
        assert_eq!(parts("#\\31 x"), vec![SimpleSelector::Id("1x".into())]);
        let [SimpleSelector::Attribute(attr)] = &parts("[title='it\\'s']")[..] else {
            panic!("expected attribute selector");
        };
        assert_eq!(attr.matcher.as_ref().unwrap().value, "it's");
    }

    #[test]
    fn combinators_and_lists() {
        let complex = single("ul > li  a.x");
        assert_eq!(complex.compounds.len(), 3);
        assert_eq!(
            complex.combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );

        let list = Selector::parse("h1, h2 ,h3").unwrap();
        assert_eq!(list.alternatives().len(), 3);
        assert_eq!(list.to_string(), "h1, h2 ,h3");
    }

    #[test]
    fn rejected_selectors() {
        let cases = [
            ("", SelectorError::EmptySelector),
            ("   ", SelectorError::EmptySelector),
            ("p:last-child", SelectorError::UnsupportedPseudoClassOrElement),
            ("p::before", SelectorError::UnsupportedPseudoClassOrElement),
            ("a + b", SelectorError::UnsupportedCombinator('+')),
            ("a ~ b", SelectorError::UnsupportedCombinator('~')),
            ("a >", SelectorError::DanglingCombinator),
            ("> a", SelectorError::DanglingCombinator),
            ("a,", SelectorError::UnexpectedEnd),
            (",a", SelectorError::UnexpectedToken(',')),
            ("svg|rect", SelectorError::NamespacedSelector),
            ("[xlink|href]", SelectorError::NamespacedSelector),
            ("#", SelectorError::InvalidId),
            ("#1a", SelectorError::InvalidId),
            (".", SelectorError::InvalidClassName),
            ("[]", SelectorError::MissingAttributeName),
            ("[a", SelectorError::UnexpectedEnd),
            ("[a=]", SelectorError::InvalidAttributeValue),
            ("[a!=b]", SelectorError::UnexpectedTokenInAttribute('!')),
            ("[a=b x]", SelectorError::UnexpectedTokenInAttribute('x')),
            ("a\\", SelectorError::InvalidEscape),
            ("a!", SelectorError::UnexpectedToken('!')),
        ];
        for (input, expected) in cases {
            assert_eq!(Selector::parse(input).unwrap_err(), expected, "{input:?}");
        }
    }

    #[test]
    fn selectors_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Selector>();
        let selector: Selector = "div".parse().unwrap();
        let copy = selector.clone();
        std::thread::spawn(move || assert_eq!(copy.as_str(), "div"))
            .join()
            .unwrap();
        assert_eq!(selector, Selector::parse(" div ").unwrap());
    }
}
