//! Resumable HTML tokenizer.
//!
//! The tokenizer consumes raw bytes of an ASCII-compatible encoding in chunks
//! of any size and reports tokens to a [`TokenSink`] as soon as their end has
//! been seen. It is an explicit state machine: when a chunk ends in the middle
//! of a construct, the bytes of that construct are kept in a memory-governed
//! buffer and scanning resumes where it stopped once the next chunk arrives.
//!
//! Invariants:
//! - Chunk-equivalence: any split of the same input yields the same tags,
//!   comments, doctypes and text nodes. Only the number of chunks a text node
//!   is reported in depends on the split.
//! - Byte coverage: concatenating the raw bytes of all tokens reproduces the
//!   input exactly.
//! - Positions: all positions kept across calls are absolute offsets into the
//!   cumulative stream; `base` is the offset of the first byte of the current
//!   working input.

use memchr::{memchr, memchr2};
use tools::mem::{LimitedBuffer, MemoryLimitExceededError, SharedMemoryLimiter};
use tools::utf8::incomplete_suffix_len;

use crate::error::TokenizerError;
use crate::names::TextType;
use crate::span::SourceLocation;
use crate::token::{
    AttributeToken, CommentToken, DoctypeToken, EndTagToken, StartTagToken, TextToken, Token,
    TokenSink,
};
use simulator::TreeBuilderSimulator;
use states::{EofRecovery, TokenizerState};

mod ambiguity_guard;
mod simulator;
mod states;


/// Configuration for the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenizerConfig {
    /// Fail with [`TokenizerError::ParsingAmbiguity`] instead of guessing when a
    /// start tag's effect on lexing depends on tree construction.
    pub strict: bool,
    /// Never end a non-final text chunk in the middle of a UTF-8 sequence.
    pub utf8_text_boundaries: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            strict: true,
            utf8_text_boundaries: true,
        }
    }
}

/// Minimal tokenizer instrumentation, always collected. Tracing of state
/// transitions additionally needs the `debug-stats` feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
    /// Number of `write` calls that ended with bytes carried to the next one.
    pub chunk_carries: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Progress,
    NeedMoreInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MatchResult {
    Matched,
    NeedMoreInput,
    NoMatch,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    fn empty_at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

#[derive(Debug)]
struct AttributeOutline {
    name: ByteRange,
    value: ByteRange,
    raw_end: usize,
}

#[derive(Debug, Default)]
struct TagOutline {
    is_end: bool,
    name: ByteRange,
    attributes: Vec<AttributeOutline>,
    self_closing: bool,
}

impl TagOutline {
    fn reset(&mut self, is_end: bool, name_start: usize) {
        self.is_end = is_end;
        self.name = ByteRange::empty_at(name_start);
        self.attributes.clear();
        self.self_closing = false;
    }
}

#[derive(Debug, Default)]
struct DoctypeOutline {
    name: Option<ByteRange>,
    public_id: Option<ByteRange>,
    system_id: Option<ByteRange>,
    force_quirks: bool,
    quote: u8,
}

/// Checks whether the letters following `<` or `</` in escaped script data
/// spell `script`.
#[derive(Debug, Default)]
struct ScriptTagProbe {
    buf: [u8; 6],
    len: usize,
    overflow: bool,
}

impl ScriptTagProbe {
    fn reset(&mut self) {
        self.len = 0;
        self.overflow = false;
    }

    fn push(&mut self, byte: u8) {
        if self.len == self.buf.len() {
            self.overflow = true;
        } else {
            self.buf[self.len] = byte.to_ascii_lowercase();
            self.len += 1;
        }
    }

    fn is_script(&self) -> bool {
        !self.overflow && &self.buf[..self.len] == b"script"
    }
}

fn is_html_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

fn tokenizer_error<E, T>(err: T) -> E
where
    E: From<TokenizerError>,
    T: Into<TokenizerError>,
{
    E::from(err.into())
}

/// HTML tokenizer.
pub struct Tokenizer {
    config: TokenizerConfig,
    state: TokenizerState,
    text_type: TextType,
    buffer: LimitedBuffer,
    base: usize,
    pos: usize,
    text_start: Option<usize>,
    text_chunk_emitted: bool,
    lexeme_start: Option<usize>,
    tag: TagOutline,
    comment_text: ByteRange,
    doctype: DoctypeOutline,
    appropriate_end_tag: Vec<u8>,
    probe: ScriptTagProbe,
    simulator: TreeBuilderSimulator,
    at_eof: bool,
    stats: TokenizerStats,
}

impl Tokenizer {
    /// `preallocated` bytes of parsing buffer are charged to `limiter` up front.
    pub fn new(
        config: TokenizerConfig,
        limiter: SharedMemoryLimiter,
        preallocated: usize,
    ) -> Result<Self, MemoryLimitExceededError> {
        let buffer = LimitedBuffer::new(limiter, preallocated)?;
        Ok(Self {
            simulator: TreeBuilderSimulator::new(config.strict),
            config,
            state: TokenizerState::Data,
            text_type: TextType::Data,
            buffer,
            base: 0,
            pos: 0,
            text_start: None,
            text_chunk_emitted: false,
            lexeme_start: None,
            tag: TagOutline::default(),
            comment_text: ByteRange::default(),
            doctype: DoctypeOutline::default(),
            appropriate_end_tag: Vec::new(),
            probe: ScriptTagProbe::default(),
            at_eof: false,
            stats: TokenizerStats::default(),
        })
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Bytes carried over from previous chunks.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn text_type(&self) -> TextType {
        self.text_type
    }

    /// Tokenize the next chunk of input.
    pub fn write<S: TokenSink>(&mut self, chunk: &[u8], sink: &mut S) -> Result<(), S::Error> {
        debug_assert!(!self.at_eof, "write after end");
        if self.buffer.is_empty() {
            self.run(chunk, sink)?;
            let retain_from = self.flush_chunk_text(chunk, sink)?;
            let tail = &chunk[retain_from - self.base..];
            self.buffer.init_with(tail).map_err(tokenizer_error::<S::Error, _>)?;
            self.base = retain_from;
        } else {
            self.buffer.append(chunk).map_err(tokenizer_error::<S::Error, _>)?;
            let input = self.buffer.take_bytes();
            let result = self
                .run(&input, sink)
                .and_then(|()| self.flush_chunk_text(&input, sink));
            self.buffer.restore_bytes(input);
            let retain_from = result?;
            self.buffer.shift(retain_from - self.base);
            self.base = retain_from;
        }
        if !self.buffer.is_empty() {
            self.stats.chunk_carries = self.stats.chunk_carries.saturating_add(1);
        }
        Ok(())
    }

    /// Finish the input: resolve pending constructs and emit `Token::Eof`.
    pub fn end<S: TokenSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        self.at_eof = true;
        let input = self.buffer.take_bytes();
        let result = self.run(&input, sink);
        let consumed = input.len();
        self.buffer.restore_bytes(input);
        result?;
        self.buffer.shift(consumed);
        self.base = self.pos;
        let end = SourceLocation::new(self.pos, self.pos);
        self.emit(sink, Token::Eof(end))
    }

    fn run<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        loop {
            if self.pos - self.base >= input.len() {
                if self.at_eof {
                    self.finish_at_eof(input, sink)?;
                }
                return Ok(());
            }
            self.stats.steps = self.stats.steps.saturating_add(1);
            match self.step(input, sink)? {
                Step::Progress => {}
                Step::NeedMoreInput => {
                    debug_assert!(!self.at_eof, "lookahead must resolve at end of input");
                    return Ok(());
                }
            }
        }
    }

    fn transition_to(&mut self, next: TokenizerState) {
        if self.state != next {
            self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
            #[cfg(any(test, feature = "debug-stats"))]
            log::trace!(
                target: "html.tokenizer",
                "state {:?} -> {:?} at {}",
                self.state,
                next,
                self.pos
            );
        }
        self.state = next;
    }

    fn step<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<Step, S::Error> {
        use TokenizerState as St;

        match self.state {
            St::Data => self.step_text_until_lt(input, St::TagOpen),
            St::RcData | St::RawText => self.step_text_until_lt(input, St::TextLessThanSign),
            St::ScriptData => self.step_text_until_lt(input, St::ScriptDataLessThanSign),
            St::PlainText => {
                self.mark_text();
                self.pos = self.base + input.len();
            }
            St::TagOpen => self.step_tag_open(input),
            St::EndTagOpen => self.step_end_tag_open(input),
            St::TagName => self.step_tag_name(input, sink)?,
            St::BeforeAttributeName => self.step_before_attribute_name(input, sink)?,
            St::AttributeName => self.step_attribute_name(input, sink)?,
            St::AfterAttributeName => self.step_after_attribute_name(input, sink)?,
            St::BeforeAttributeValue => self.step_before_attribute_value(input, sink)?,
            St::AttributeValueDoubleQuoted => self.step_attribute_value_quoted(input, b'"'),
            St::AttributeValueSingleQuoted => self.step_attribute_value_quoted(input, b'\''),
            St::AttributeValueUnquoted => self.step_attribute_value_unquoted(input, sink)?,
            St::AfterAttributeValueQuoted => {
                let byte = self.current(input);
                match byte {
                    b'/' => {
                        self.pos += 1;
                        self.transition_to(St::SelfClosingStartTag);
                    }
                    b'>' => {
                        self.pos += 1;
                        self.emit_tag(input, sink)?;
                    }
                    _ => {
                        if is_html_whitespace(byte) {
                            self.pos += 1;
                        }
                        self.transition_to(St::BeforeAttributeName);
                    }
                }
            }
            St::SelfClosingStartTag => {
                if self.current(input) == b'>' {
                    self.tag.self_closing = true;
                    self.pos += 1;
                    self.emit_tag(input, sink)?;
                } else {
                    self.transition_to(St::BeforeAttributeName);
                }
            }
            St::TextLessThanSign => {
                if self.current(input) == b'/' {
                    self.pos += 1;
                    self.transition_to(St::TextEndTagOpen);
                } else {
                    self.abandon_lexeme();
                    self.transition_to(self.text_state());
                }
            }
            St::ScriptDataLessThanSign => match self.current(input) {
                b'/' => {
                    self.pos += 1;
                    self.transition_to(St::TextEndTagOpen);
                }
                b'!' => {
                    self.abandon_lexeme();
                    self.pos += 1;
                    self.transition_to(St::ScriptDataEscapeStart);
                }
                _ => {
                    self.abandon_lexeme();
                    self.transition_to(St::ScriptData);
                }
            },
            St::TextEndTagOpen => {
                self.step_raw_end_tag_open(input, St::TextEndTagName, self.text_state())
            }
            St::TextEndTagName => {
                self.step_raw_end_tag_name(input, sink, self.text_state())?
            }
            St::ScriptDataEscapeStart | St::ScriptDataEscapeStartDash => {
                if self.current(input) == b'-' {
                    self.pos += 1;
                    self.transition_to(if self.state == St::ScriptDataEscapeStart {
                        St::ScriptDataEscapeStartDash
                    } else {
                        St::ScriptDataEscapedDashDash
                    });
                } else {
                    self.transition_to(St::ScriptData);
                }
            }
            St::ScriptDataEscaped => {
                self.mark_text();
                let rest = self.rest(input);
                match memchr2(b'-', b'<', rest) {
                    Some(idx) => {
                        self.pos += idx;
                        self.step_script_escaped_special(input);
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::ScriptDataEscapedDash | St::ScriptDataEscapedDashDash => {
                match self.current(input) {
                    b'-' => {
                        self.pos += 1;
                        self.transition_to(St::ScriptDataEscapedDashDash);
                    }
                    b'<' => self.step_script_escaped_special(input),
                    b'>' if self.state == St::ScriptDataEscapedDashDash => {
                        self.pos += 1;
                        self.transition_to(St::ScriptData);
                    }
                    _ => {
                        self.pos += 1;
                        self.transition_to(St::ScriptDataEscaped);
                    }
                }
            }
            St::ScriptDataEscapedLessThanSign => {
                let byte = self.current(input);
                if byte == b'/' {
                    self.pos += 1;
                    self.transition_to(St::ScriptDataEscapedEndTagOpen);
                } else if byte.is_ascii_alphabetic() {
                    self.abandon_lexeme();
                    self.probe.reset();
                    self.transition_to(St::ScriptDataDoubleEscapeStart);
                } else {
                    self.abandon_lexeme();
                    self.transition_to(St::ScriptDataEscaped);
                }
            }
            St::ScriptDataEscapedEndTagOpen => self.step_raw_end_tag_open(
                input,
                St::ScriptDataEscapedEndTagName,
                St::ScriptDataEscaped,
            ),
            St::ScriptDataEscapedEndTagName => {
                self.step_raw_end_tag_name(input, sink, St::ScriptDataEscaped)?
            }
            St::ScriptDataDoubleEscapeStart | St::ScriptDataDoubleEscapeEnd => {
                let byte = self.current(input);
                let entering = self.state == St::ScriptDataDoubleEscapeStart;
                let (on_script, otherwise) = if entering {
                    (St::ScriptDataDoubleEscaped, St::ScriptDataEscaped)
                } else {
                    (St::ScriptDataEscaped, St::ScriptDataDoubleEscaped)
                };
                if is_html_whitespace(byte) || byte == b'/' || byte == b'>' {
                    self.pos += 1;
                    self.transition_to(if self.probe.is_script() {
                        on_script
                    } else {
                        otherwise
                    });
                } else if byte.is_ascii_alphabetic() {
                    self.probe.push(byte);
                    self.pos += 1;
                } else {
                    // The letters so far were plain script text.
                    self.transition_to(otherwise);
                }
            }
            St::ScriptDataDoubleEscaped => {
                let rest = self.rest(input);
                match memchr2(b'-', b'<', rest) {
                    Some(idx) => {
                        self.pos += idx;
                        self.step_script_double_escaped_special(input);
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::ScriptDataDoubleEscapedDash | St::ScriptDataDoubleEscapedDashDash => {
                match self.current(input) {
                    b'-' => {
                        self.pos += 1;
                        self.transition_to(St::ScriptDataDoubleEscapedDashDash);
                    }
                    b'<' => self.step_script_double_escaped_special(input),
                    b'>' if self.state == St::ScriptDataDoubleEscapedDashDash => {
                        self.pos += 1;
                        self.transition_to(St::ScriptData);
                    }
                    _ => {
                        self.pos += 1;
                        self.transition_to(St::ScriptDataDoubleEscaped);
                    }
                }
            }
            St::ScriptDataDoubleEscapedLessThanSign => {
                if self.current(input) == b'/' {
                    self.pos += 1;
                    self.probe.reset();
                    self.transition_to(St::ScriptDataDoubleEscapeEnd);
                } else {
                    self.transition_to(St::ScriptDataDoubleEscaped);
                }
            }
            St::CdataSection => {
                self.mark_text();
                let rest = self.rest(input);
                match memchr(b']', rest) {
                    Some(idx) => {
                        self.pos += idx + 1;
                        self.transition_to(St::CdataSectionBracket);
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::CdataSectionBracket => {
                if self.current(input) == b']' {
                    self.pos += 1;
                    self.transition_to(St::CdataSectionEnd);
                } else {
                    self.transition_to(St::CdataSection);
                }
            }
            St::CdataSectionEnd => match self.current(input) {
                b']' => self.pos += 1,
                b'>' => {
                    self.pos += 1;
                    self.flush_text_node(input, sink)?;
                    self.text_type = TextType::Data;
                    self.transition_to(St::Data);
                }
                _ => self.transition_to(St::CdataSection),
            },
            St::MarkupDeclarationOpen => {
                return self.step_markup_declaration_open(input, sink);
            }
            St::CommentStart | St::CommentStartDash => match self.current(input) {
                b'-' => {
                    self.pos += 1;
                    self.transition_to(if self.state == St::CommentStart {
                        St::CommentStartDash
                    } else {
                        St::CommentEnd
                    });
                }
                b'>' => {
                    // `<!-->` and `<!--->` are complete, empty comments.
                    self.comment_text.end = self.comment_text.start;
                    self.pos += 1;
                    self.emit_comment(input, sink)?;
                }
                _ => self.transition_to(St::Comment),
            },
            St::Comment => {
                let rest = self.rest(input);
                match memchr(b'-', rest) {
                    Some(idx) => {
                        self.pos += idx + 1;
                        self.transition_to(St::CommentEndDash);
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::CommentEndDash => {
                if self.current(input) == b'-' {
                    self.pos += 1;
                    self.transition_to(St::CommentEnd);
                } else {
                    self.transition_to(St::Comment);
                }
            }
            St::CommentEnd => match self.current(input) {
                b'>' => {
                    self.comment_text.end = self.comment_text.start.max(self.pos - 2);
                    self.pos += 1;
                    self.emit_comment(input, sink)?;
                }
                b'!' => {
                    self.pos += 1;
                    self.transition_to(St::CommentEndBang);
                }
                b'-' => self.pos += 1,
                _ => self.transition_to(St::Comment),
            },
            St::CommentEndBang => match self.current(input) {
                b'-' => {
                    self.pos += 1;
                    self.transition_to(St::CommentEndDash);
                }
                b'>' => {
                    self.comment_text.end = self.comment_text.start.max(self.pos - 3);
                    self.pos += 1;
                    self.emit_comment(input, sink)?;
                }
                _ => self.transition_to(St::Comment),
            },
            St::BogusComment => {
                let rest = self.rest(input);
                match memchr(b'>', rest) {
                    Some(idx) => {
                        self.pos += idx;
                        self.comment_text.end = self.pos;
                        self.pos += 1;
                        self.emit_comment(input, sink)?;
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::Doctype => {
                if is_html_whitespace(self.current(input)) {
                    self.pos += 1;
                }
                self.transition_to(St::BeforeDoctypeName);
            }
            St::BeforeDoctypeName => {
                let byte = self.current(input);
                if is_html_whitespace(byte) {
                    self.pos += 1;
                } else if byte == b'>' {
                    self.doctype.force_quirks = true;
                    self.pos += 1;
                    self.emit_doctype(input, sink)?;
                } else {
                    self.doctype.name = Some(ByteRange::empty_at(self.pos));
                    self.pos += 1;
                    self.transition_to(St::DoctypeName);
                }
            }
            St::DoctypeName => {
                let rest = self.rest(input);
                match rest
                    .iter()
                    .position(|&b| is_html_whitespace(b) || b == b'>')
                {
                    Some(idx) => {
                        self.pos += idx;
                        if let Some(name) = self.doctype.name.as_mut() {
                            name.end = self.pos;
                        }
                        let byte = rest[idx];
                        self.pos += 1;
                        if byte == b'>' {
                            self.emit_doctype(input, sink)?;
                        } else {
                            self.transition_to(St::AfterDoctypeName);
                        }
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::AfterDoctypeName => {
                let byte = self.current(input);
                if is_html_whitespace(byte) {
                    self.pos += 1;
                } else if byte == b'>' {
                    self.pos += 1;
                    self.emit_doctype(input, sink)?;
                } else {
                    match self.match_prefix(input, b"public", true) {
                        MatchResult::Matched => {
                            self.pos += 6;
                            self.transition_to(St::AfterDoctypePublicKeyword);
                            return Ok(Step::Progress);
                        }
                        MatchResult::NeedMoreInput => return Ok(Step::NeedMoreInput),
                        MatchResult::NoMatch => {}
                    }
                    match self.match_prefix(input, b"system", true) {
                        MatchResult::Matched => {
                            self.pos += 6;
                            self.transition_to(St::AfterDoctypeSystemKeyword);
                        }
                        MatchResult::NeedMoreInput => return Ok(Step::NeedMoreInput),
                        MatchResult::NoMatch => {
                            self.doctype.force_quirks = true;
                            self.transition_to(St::BogusDoctype);
                        }
                    }
                }
            }
            St::AfterDoctypePublicKeyword
            | St::BeforeDoctypePublicIdentifier
            | St::AfterDoctypeSystemKeyword
            | St::BeforeDoctypeSystemIdentifier => {
                let system = matches!(
                    self.state,
                    St::AfterDoctypeSystemKeyword | St::BeforeDoctypeSystemIdentifier
                );
                let byte = self.current(input);
                if is_html_whitespace(byte) {
                    self.pos += 1;
                    self.transition_to(if system {
                        St::BeforeDoctypeSystemIdentifier
                    } else {
                        St::BeforeDoctypePublicIdentifier
                    });
                } else {
                    self.step_doctype_identifier_start(input, sink, system)?;
                }
            }
            St::DoctypePublicIdentifier | St::DoctypeSystemIdentifier => {
                let system = self.state == St::DoctypeSystemIdentifier;
                let rest = self.rest(input);
                match memchr2(self.doctype.quote, b'>', rest) {
                    Some(idx) => {
                        self.pos += idx;
                        let end = self.pos;
                        let id = if system {
                            self.doctype.system_id.as_mut()
                        } else {
                            self.doctype.public_id.as_mut()
                        };
                        if let Some(id) = id {
                            id.end = end;
                        }
                        let byte = rest[idx];
                        self.pos += 1;
                        if byte == b'>' {
                            self.doctype.force_quirks = true;
                            self.emit_doctype(input, sink)?;
                        } else {
                            self.transition_to(if system {
                                St::AfterDoctypeSystemIdentifier
                            } else {
                                St::AfterDoctypePublicIdentifier
                            });
                        }
                    }
                    None => self.pos += rest.len(),
                }
            }
            St::AfterDoctypePublicIdentifier | St::BetweenDoctypePublicAndSystemIdentifiers => {
                let byte = self.current(input);
                if is_html_whitespace(byte) {
                    self.pos += 1;
                    self.transition_to(St::BetweenDoctypePublicAndSystemIdentifiers);
                } else {
                    self.step_doctype_identifier_start(input, sink, true)?;
                }
            }
            St::AfterDoctypeSystemIdentifier => {
                let byte = self.current(input);
                if is_html_whitespace(byte) {
                    self.pos += 1;
                } else if byte == b'>' {
                    self.pos += 1;
                    self.emit_doctype(input, sink)?;
                } else {
                    self.transition_to(St::BogusDoctype);
                }
            }
            St::BogusDoctype => {
                let rest = self.rest(input);
                match memchr(b'>', rest) {
                    Some(idx) => {
                        self.pos += idx + 1;
                        self.emit_doctype(input, sink)?;
                    }
                    None => self.pos += rest.len(),
                }
            }
        }
        Ok(Step::Progress)
    }

    // ---- text ----

    fn step_text_until_lt(&mut self, input: &[u8], lt_state: TokenizerState) {
        let rest = self.rest(input);
        match memchr(b'<', rest) {
            Some(idx) => {
                if idx > 0 {
                    self.mark_text();
                    self.pos += idx;
                }
                self.lexeme_start = Some(self.pos);
                self.pos += 1;
                self.transition_to(lt_state);
            }
            None => {
                self.mark_text();
                self.pos += rest.len();
            }
        }
    }

    fn text_state(&self) -> TokenizerState {
        match self.text_type {
            TextType::Data => TokenizerState::Data,
            TextType::RcData => TokenizerState::RcData,
            TextType::RawText => TokenizerState::RawText,
            TextType::ScriptData => TokenizerState::ScriptData,
            TextType::PlainText => TokenizerState::PlainText,
            TextType::CdataSection => TokenizerState::CdataSection,
        }
    }

    fn mark_text(&mut self) {
        if self.text_start.is_none() {
            self.text_start = Some(self.pos);
        }
    }

    /// The construct that started at `lexeme_start` turned out to be text.
    fn abandon_lexeme(&mut self) {
        if let Some(start) = self.lexeme_start.take() {
            if self.text_start.is_none() {
                self.text_start = Some(start);
            }
        }
    }

    /// `<` or `-` inside escaped script data.
    fn step_script_escaped_special(&mut self, input: &[u8]) {
        if self.current(input) == b'<' {
            self.lexeme_start = Some(self.pos);
            self.pos += 1;
            self.transition_to(TokenizerState::ScriptDataEscapedLessThanSign);
        } else {
            self.pos += 1;
            self.transition_to(TokenizerState::ScriptDataEscapedDash);
        }
    }

    fn step_script_double_escaped_special(&mut self, input: &[u8]) {
        let next = if self.current(input) == b'<' {
            TokenizerState::ScriptDataDoubleEscapedLessThanSign
        } else {
            TokenizerState::ScriptDataDoubleEscapedDash
        };
        self.pos += 1;
        self.transition_to(next);
    }

    fn step_raw_end_tag_open(
        &mut self,
        input: &[u8],
        name_state: TokenizerState,
        fallback: TokenizerState,
    ) {
        if self.current(input).is_ascii_alphabetic() {
            self.tag.reset(true, self.pos);
            self.pos += 1;
            self.transition_to(name_state);
        } else {
            self.abandon_lexeme();
            self.transition_to(fallback);
        }
    }

    /// Name of a candidate end tag inside RCDATA, RAWTEXT or script data. Only
    /// the end tag of the element that switched the text type ends the text.
    fn step_raw_end_tag_name<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
        fallback: TokenizerState,
    ) -> Result<(), S::Error> {
        let rest = self.rest(input);
        let Some(idx) = rest.iter().position(|b| !b.is_ascii_alphabetic()) else {
            self.pos += rest.len();
            return Ok(());
        };
        self.pos += idx;
        let byte = rest[idx];
        let name = self.slice(input, ByteRange {
            start: self.tag.name.start,
            end: self.pos,
        });
        let terminates = is_html_whitespace(byte) || byte == b'/' || byte == b'>';
        if !terminates || !name.eq_ignore_ascii_case(&self.appropriate_end_tag) {
            self.abandon_lexeme();
            self.transition_to(fallback);
            return Ok(());
        }

        self.tag.name.end = self.pos;
        self.pos += 1;
        match byte {
            b'>' => self.emit_tag(input, sink)?,
            b'/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            _ => self.transition_to(TokenizerState::BeforeAttributeName),
        }
        Ok(())
    }

    // ---- tags ----

    fn step_tag_open(&mut self, input: &[u8]) {
        let byte = self.current(input);
        match byte {
            b'!' => {
                self.pos += 1;
                self.transition_to(TokenizerState::MarkupDeclarationOpen);
            }
            b'/' => {
                self.pos += 1;
                self.transition_to(TokenizerState::EndTagOpen);
            }
            b'?' => {
                self.comment_text = ByteRange::empty_at(self.pos);
                self.transition_to(TokenizerState::BogusComment);
            }
            _ if byte.is_ascii_alphabetic() => {
                self.tag.reset(false, self.pos);
                self.pos += 1;
                self.transition_to(TokenizerState::TagName);
            }
            _ => {
                self.abandon_lexeme();
                self.transition_to(TokenizerState::Data);
            }
        }
    }

    fn step_end_tag_open(&mut self, input: &[u8]) {
        let byte = self.current(input);
        if byte.is_ascii_alphabetic() {
            self.tag.reset(true, self.pos);
            self.pos += 1;
            self.transition_to(TokenizerState::TagName);
        } else if byte == b'>' {
            // `</>` produces no token in a browser; keep its bytes as text.
            self.pos += 1;
            self.abandon_lexeme();
            self.transition_to(TokenizerState::Data);
        } else {
            self.comment_text = ByteRange::empty_at(self.pos);
            self.transition_to(TokenizerState::BogusComment);
        }
    }

    fn step_tag_name<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let rest = self.rest(input);
        match rest
            .iter()
            .position(|&b| is_html_whitespace(b) || b == b'/' || b == b'>')
        {
            Some(idx) => {
                self.pos += idx;
                self.tag.name.end = self.pos;
                let byte = rest[idx];
                self.pos += 1;
                match byte {
                    b'>' => self.emit_tag(input, sink)?,
                    b'/' => self.transition_to(TokenizerState::SelfClosingStartTag),
                    _ => self.transition_to(TokenizerState::BeforeAttributeName),
                }
            }
            None => self.pos += rest.len(),
        }
        Ok(())
    }

    fn start_attribute(&mut self) {
        self.tag.attributes.push(AttributeOutline {
            name: ByteRange::empty_at(self.pos),
            value: ByteRange::empty_at(self.pos),
            raw_end: self.pos,
        });
        self.pos += 1;
        self.transition_to(TokenizerState::AttributeName);
    }

    fn step_before_attribute_name<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<(), S::Error> {
        match self.current(input) {
            byte if is_html_whitespace(byte) => self.pos += 1,
            b'/' => {
                self.pos += 1;
                self.transition_to(TokenizerState::SelfClosingStartTag);
            }
            b'>' => {
                self.pos += 1;
                self.emit_tag(input, sink)?;
            }
            // Anything else, `=` included, starts an attribute name.
            _ => self.start_attribute(),
        }
        Ok(())
    }

    fn step_attribute_name<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<(), S::Error> {
        let rest = self.rest(input);
        let Some(idx) = rest
            .iter()
            .position(|&b| is_html_whitespace(b) || matches!(b, b'/' | b'>' | b'='))
        else {
            self.pos += rest.len();
            return Ok(());
        };
        self.pos += idx;
        let end = self.pos;
        if let Some(attr) = self.tag.attributes.last_mut() {
            attr.name.end = end;
            attr.value = ByteRange::empty_at(end);
            attr.raw_end = end;
        }
        let byte = rest[idx];
        self.pos += 1;
        match byte {
            b'/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            b'>' => self.emit_tag(input, sink)?,
            b'=' => self.transition_to(TokenizerState::BeforeAttributeValue),
            _ => self.transition_to(TokenizerState::AfterAttributeName),
        }
        Ok(())
    }

    fn step_after_attribute_name<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<(), S::Error> {
        match self.current(input) {
            byte if is_html_whitespace(byte) => self.pos += 1,
            b'/' => {
                self.pos += 1;
                self.transition_to(TokenizerState::SelfClosingStartTag);
            }
            b'=' => {
                self.pos += 1;
                self.transition_to(TokenizerState::BeforeAttributeValue);
            }
            b'>' => {
                self.pos += 1;
                self.emit_tag(input, sink)?;
            }
            _ => self.start_attribute(),
        }
        Ok(())
    }

    fn step_before_attribute_value<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<(), S::Error> {
        let byte = self.current(input);
        if is_html_whitespace(byte) {
            self.pos += 1;
            return Ok(());
        }
        if byte == b'>' {
            self.pos += 1;
            return self.emit_tag(input, sink);
        }

        let next = match byte {
            b'"' => {
                self.pos += 1;
                TokenizerState::AttributeValueDoubleQuoted
            }
            b'\'' => {
                self.pos += 1;
                TokenizerState::AttributeValueSingleQuoted
            }
            _ => TokenizerState::AttributeValueUnquoted,
        };
        let value_start = self.pos;
        if let Some(attr) = self.tag.attributes.last_mut() {
            attr.value = ByteRange::empty_at(value_start);
        }
        self.transition_to(next);
        Ok(())
    }

    fn step_attribute_value_quoted(&mut self, input: &[u8], quote: u8) {
        let rest = self.rest(input);
        match memchr(quote, rest) {
            Some(idx) => {
                self.pos += idx;
                let end = self.pos;
                if let Some(attr) = self.tag.attributes.last_mut() {
                    attr.value.end = end;
                    attr.raw_end = end + 1;
                }
                self.pos += 1;
                self.transition_to(TokenizerState::AfterAttributeValueQuoted);
            }
            None => self.pos += rest.len(),
        }
    }

    fn step_attribute_value_unquoted<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<(), S::Error> {
        let rest = self.rest(input);
        let Some(idx) = rest
            .iter()
            .position(|&b| is_html_whitespace(b) || b == b'>')
        else {
            self.pos += rest.len();
            return Ok(());
        };
        self.pos += idx;
        let end = self.pos;
        if let Some(attr) = self.tag.attributes.last_mut() {
            attr.value.end = end;
            attr.raw_end = end;
        }
        let byte = rest[idx];
        self.pos += 1;
        if byte == b'>' {
            self.emit_tag(input, sink)?;
        } else {
            self.transition_to(TokenizerState::BeforeAttributeName);
        }
        Ok(())
    }

    // ---- markup declarations ----

    fn step_markup_declaration_open<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> Result<Step, S::Error> {
        match self.match_prefix(input, b"--", false) {
            MatchResult::Matched => {
                self.pos += 2;
                self.comment_text = ByteRange::empty_at(self.pos);
                self.transition_to(TokenizerState::CommentStart);
                return Ok(Step::Progress);
            }
            MatchResult::NeedMoreInput => return Ok(Step::NeedMoreInput),
            MatchResult::NoMatch => {}
        }

        match self.match_prefix(input, b"doctype", true) {
            MatchResult::Matched => {
                self.pos += 7;
                self.doctype = DoctypeOutline::default();
                self.transition_to(TokenizerState::Doctype);
                return Ok(Step::Progress);
            }
            MatchResult::NeedMoreInput => return Ok(Step::NeedMoreInput),
            MatchResult::NoMatch => {}
        }

        if self.simulator.in_foreign_content() {
            match self.match_prefix(input, b"[CDATA[", false) {
                MatchResult::Matched => {
                    // The section, markers included, becomes its own text node.
                    self.flush_text_node(input, sink)?;
                    self.text_start = self.lexeme_start.take();
                    self.text_type = TextType::CdataSection;
                    self.pos += 7;
                    self.transition_to(TokenizerState::CdataSection);
                    return Ok(Step::Progress);
                }
                MatchResult::NeedMoreInput => return Ok(Step::NeedMoreInput),
                MatchResult::NoMatch => {}
            }
        }

        self.comment_text = ByteRange::empty_at(self.pos);
        self.transition_to(TokenizerState::BogusComment);
        Ok(Step::Progress)
    }

    fn step_doctype_identifier_start<S: TokenSink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
        system: bool,
    ) -> Result<(), S::Error> {
        let byte = self.current(input);
        match byte {
            b'"' | b'\'' => {
                self.pos += 1;
                self.doctype.quote = byte;
                let id = Some(ByteRange::empty_at(self.pos));
                if system {
                    self.doctype.system_id = id;
                    self.transition_to(TokenizerState::DoctypeSystemIdentifier);
                } else {
                    self.doctype.public_id = id;
                    self.transition_to(TokenizerState::DoctypePublicIdentifier);
                }
            }
            b'>' => {
                // A missing identifier only forces quirks after a keyword.
                if !matches!(
                    self.state,
                    TokenizerState::AfterDoctypePublicIdentifier
                        | TokenizerState::BetweenDoctypePublicAndSystemIdentifiers
                ) {
                    self.doctype.force_quirks = true;
                }
                self.pos += 1;
                self.emit_doctype(input, sink)?;
            }
            _ => {
                self.doctype.force_quirks = true;
                self.transition_to(TokenizerState::BogusDoctype);
            }
        }
        Ok(())
    }

    // ---- emission ----

    fn emit<S: TokenSink>(&mut self, sink: &mut S, token: Token<'_>) -> Result<(), S::Error> {
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
        sink.handle_token(token)
    }

    fn emit_text<S: TokenSink>(
        &mut self,
        input: &[u8],
        range: ByteRange,
        last: bool,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        self.text_chunk_emitted = !last;
        let token = Token::Text(TextToken {
            text: self.slice(input, range),
            text_type: self.text_type,
            last_in_text_node: last,
            location: SourceLocation::new(range.start, range.end),
        });
        self.emit(sink, token)
    }

    /// End the current text node before a non-text token (or end of input).
    fn flush_text_node<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let end = self.lexeme_start.unwrap_or(self.pos);
        match self.text_start.take() {
            Some(start) if start < end => self.emit_text(input, ByteRange { start, end }, true, sink),
            _ if self.text_chunk_emitted => {
                self.emit_text(input, ByteRange::empty_at(end), true, sink)
            }
            _ => Ok(()),
        }
    }

    /// Emit the text seen so far at the end of a chunk. Returns the offset
    /// from which input has to be kept for the next chunk.
    fn flush_chunk_text<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<usize, S::Error> {
        let end = self.lexeme_start.unwrap_or(self.pos);
        let Some(start) = self.text_start else {
            return Ok(end);
        };
        let mut cut = end;
        if self.config.utf8_text_boundaries {
            cut -= incomplete_suffix_len(self.slice(input, ByteRange { start, end }));
        }
        if cut > start {
            self.emit_text(input, ByteRange { start, end: cut }, false, sink)?;
            self.text_start = Some(cut);
        }
        Ok(cut)
    }

    fn emit_tag<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let start = self.lexeme_start.unwrap_or(self.tag.name.start);
        let location = SourceLocation::new(start, self.pos);
        let raw = self.slice(input, ByteRange {
            start,
            end: self.pos,
        });
        let name = self.slice(input, self.tag.name);

        if self.tag.is_end {
            self.simulator.on_end_tag(name);
            self.flush_text_node(input, sink)?;
            self.lexeme_start = None;
            self.text_type = TextType::Data;
            self.transition_to(TokenizerState::Data);
            return self.emit(sink, Token::EndTag(EndTagToken { name, raw, location }));
        }

        let attributes: Vec<AttributeToken<'_>> = self
            .tag
            .attributes
            .iter()
            .map(|attr| AttributeToken {
                name: self.slice(input, attr.name),
                value: self.slice(input, attr.value),
                raw: self.slice(input, ByteRange {
                    start: attr.name.start,
                    end: attr.raw_end,
                }),
            })
            .collect();
        let self_closing = self.tag.self_closing;
        let feedback = self
            .simulator
            .on_start_tag(name, &attributes, self_closing)
            .map_err(tokenizer_error::<S::Error, _>)?;

        self.flush_text_node(input, sink)?;
        self.lexeme_start = None;
        match feedback.text_type {
            Some(text_type) => {
                self.text_type = text_type;
                self.appropriate_end_tag = name.to_ascii_lowercase();
            }
            None => self.text_type = TextType::Data,
        }
        self.transition_to(self.text_state());

        self.emit(
            sink,
            Token::StartTag(StartTagToken {
                name,
                attributes,
                self_closing,
                namespace: feedback.namespace,
                can_have_content: feedback.can_have_content,
                raw,
                location,
            }),
        )
    }

    fn emit_comment<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let start = self.lexeme_start.unwrap_or(self.comment_text.start);
        let location = SourceLocation::new(start, self.pos);
        let token = CommentToken {
            text: self.slice(input, self.comment_text),
            raw: self.slice(input, ByteRange {
                start,
                end: self.pos,
            }),
            location,
        };
        self.flush_text_node(input, sink)?;
        self.lexeme_start = None;
        self.transition_to(TokenizerState::Data);
        self.emit(sink, Token::Comment(token))
    }

    fn emit_doctype<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        let start = self.lexeme_start.unwrap_or(self.pos);
        let location = SourceLocation::new(start, self.pos);
        let token = DoctypeToken {
            name: self.doctype.name.map(|range| self.slice(input, range)),
            public_id: self.doctype.public_id.map(|range| self.slice(input, range)),
            system_id: self.doctype.system_id.map(|range| self.slice(input, range)),
            force_quirks: self.doctype.force_quirks,
            raw: self.slice(input, ByteRange {
                start,
                end: self.pos,
            }),
            location,
        };
        self.flush_text_node(input, sink)?;
        self.lexeme_start = None;
        self.transition_to(TokenizerState::Data);
        self.emit(sink, Token::Doctype(token))
    }

    fn finish_at_eof<S: TokenSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), S::Error> {
        use TokenizerState as St;

        match self.state.eof_recovery() {
            EofRecovery::Text => {}
            EofRecovery::Tag => self.abandon_lexeme(),
            EofRecovery::Comment => {
                let start = self.comment_text.start;
                let end = match self.state {
                    St::MarkupDeclarationOpen => {
                        self.comment_text.start = self.pos;
                        self.pos
                    }
                    St::CommentStart | St::CommentStartDash => start,
                    St::CommentEndDash => self.pos - 1,
                    St::CommentEnd => self.pos - 2,
                    St::CommentEndBang => self.pos - 3,
                    _ => self.pos,
                };
                self.comment_text.end = end.max(self.comment_text.start);
                self.emit_comment(input, sink)?;
            }
            EofRecovery::Doctype => {
                let end = self.pos;
                let open = match self.state {
                    St::DoctypeName => self.doctype.name.as_mut(),
                    St::DoctypePublicIdentifier => self.doctype.public_id.as_mut(),
                    St::DoctypeSystemIdentifier => self.doctype.system_id.as_mut(),
                    _ => None,
                };
                if let Some(range) = open {
                    range.end = end;
                }
                self.doctype.force_quirks = true;
                self.emit_doctype(input, sink)?;
            }
        }
        self.flush_text_node(input, sink)
    }

    // ---- input access ----

    fn current(&self, input: &[u8]) -> u8 {
        input[self.pos - self.base]
    }

    fn rest<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.pos - self.base..]
    }

    fn slice<'a>(&self, input: &'a [u8], range: ByteRange) -> &'a [u8] {
        &input[range.start - self.base..range.end - self.base]
    }

    fn match_prefix(&self, input: &[u8], pattern: &[u8], ignore_case: bool) -> MatchResult {
        let rest = self.rest(input);
        let n = rest.len().min(pattern.len());
        let head_matches = if ignore_case {
            rest[..n].eq_ignore_ascii_case(&pattern[..n])
        } else {
            rest[..n] == pattern[..n]
        };
        if !head_matches {
            MatchResult::NoMatch
        } else if n == pattern.len() {
            MatchResult::Matched
        } else if self.at_eof {
            MatchResult::NoMatch
        } else {
            MatchResult::NeedMoreInput
        }
    }
}
