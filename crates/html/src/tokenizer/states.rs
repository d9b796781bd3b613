//! Tokenizer state machine definitions.
//!
//! The names follow the HTML tokenization states. Character references are not
//! decoded and parse errors are not reported, so the states that only exist
//! for those purposes are folded into their neighbours.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenizerState {
    Data,
    RcData,
    RawText,
    ScriptData,
    PlainText,
    TagOpen,
    EndTagOpen,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    /// `<` in RCDATA or RAWTEXT.
    TextLessThanSign,
    /// `</` in RCDATA, RAWTEXT or script data.
    TextEndTagOpen,
    TextEndTagName,
    ScriptDataLessThanSign,
    ScriptDataEscapeStart,
    ScriptDataEscapeStartDash,
    ScriptDataEscaped,
    ScriptDataEscapedDash,
    ScriptDataEscapedDashDash,
    ScriptDataEscapedLessThanSign,
    ScriptDataEscapedEndTagOpen,
    ScriptDataEscapedEndTagName,
    ScriptDataDoubleEscapeStart,
    ScriptDataDoubleEscaped,
    ScriptDataDoubleEscapedDash,
    ScriptDataDoubleEscapedDashDash,
    ScriptDataDoubleEscapedLessThanSign,
    ScriptDataDoubleEscapeEnd,
    CdataSection,
    CdataSectionBracket,
    CdataSectionEnd,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    BogusComment,
    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    AfterDoctypePublicKeyword,
    BeforeDoctypePublicIdentifier,
    DoctypePublicIdentifier,
    AfterDoctypePublicIdentifier,
    BetweenDoctypePublicAndSystemIdentifiers,
    AfterDoctypeSystemKeyword,
    BeforeDoctypeSystemIdentifier,
    DoctypeSystemIdentifier,
    AfterDoctypeSystemIdentifier,
    BogusDoctype,
}

/// What the bytes of an unfinished construct become when input ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EofRecovery {
    /// Nothing pending beyond text.
    Text,
    /// An unfinished tag; its bytes are emitted as text.
    Tag,
    Comment,
    Doctype,
}

impl TokenizerState {
    pub(crate) fn eof_recovery(self) -> EofRecovery {
        use TokenizerState::*;
        match self {
            Data
            | RcData
            | RawText
            | ScriptData
            | PlainText
            | ScriptDataEscapeStart
            | ScriptDataEscapeStartDash
            | ScriptDataEscaped
            | ScriptDataEscapedDash
            | ScriptDataEscapedDashDash
            | ScriptDataDoubleEscapeStart
            | ScriptDataDoubleEscaped
            | ScriptDataDoubleEscapedDash
            | ScriptDataDoubleEscapedDashDash
            | ScriptDataDoubleEscapedLessThanSign
            | ScriptDataDoubleEscapeEnd
            | CdataSection
            | CdataSectionBracket
            | CdataSectionEnd => EofRecovery::Text,
            TagOpen
            | EndTagOpen
            | TagName
            | BeforeAttributeName
            | AttributeName
            | AfterAttributeName
            | BeforeAttributeValue
            | AttributeValueDoubleQuoted
            | AttributeValueSingleQuoted
            | AttributeValueUnquoted
            | AfterAttributeValueQuoted
            | SelfClosingStartTag
            | TextLessThanSign
            | TextEndTagOpen
            | TextEndTagName
            | ScriptDataLessThanSign
            | ScriptDataEscapedLessThanSign
            | ScriptDataEscapedEndTagOpen
            | ScriptDataEscapedEndTagName => EofRecovery::Tag,
            MarkupDeclarationOpen | CommentStart | CommentStartDash | Comment | CommentEndDash
            | CommentEnd | CommentEndBang | BogusComment => EofRecovery::Comment,
            Doctype
            | BeforeDoctypeName
            | DoctypeName
            | AfterDoctypeName
            | AfterDoctypePublicKeyword
            | BeforeDoctypePublicIdentifier
            | DoctypePublicIdentifier
            | AfterDoctypePublicIdentifier
            | BetweenDoctypePublicAndSystemIdentifiers
            | AfterDoctypeSystemKeyword
            | BeforeDoctypeSystemIdentifier
            | DoctypeSystemIdentifier
            | AfterDoctypeSystemIdentifier
            | BogusDoctype => EofRecovery::Doctype,
        }
    }
}
