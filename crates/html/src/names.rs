//! Namespaces, text parsing modes and the tag name tables the tokenizer
//! consults.
//!
//! Tag names arrive as raw bytes with their original case. The lookups here
//! fold them into a small stack buffer first; no known tag is longer than
//! [`MAX_KNOWN_TAG_LEN`] bytes, so anything longer is simply "unknown".

pub(crate) const MAX_KNOWN_TAG_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// How the bytes between tags are lexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextType {
    /// Regular content; tags, comments and doctypes are recognized.
    Data,
    /// `<title>` and `<textarea>` content; only the matching end tag ends it.
    RcData,
    /// `<style>`, `<xmp>`, `<iframe>`, `<noembed>`, `<noframes>`, `<noscript>`.
    RawText,
    /// `<script>` content, including its escaped comment-like forms.
    ScriptData,
    /// Everything after `<plaintext>`.
    PlainText,
    /// A `<![CDATA[ ... ]]>` section inside SVG or MathML.
    CdataSection,
}

impl TextType {
    /// Text type an HTML start tag switches the tokenizer into.
    pub(crate) fn for_html_start_tag(local_name: &[u8]) -> Option<TextType> {
        match local_name {
            b"title" | b"textarea" => Some(TextType::RcData),
            b"style" | b"xmp" | b"iframe" | b"noembed" | b"noframes" | b"noscript" => {
                Some(TextType::RawText)
            }
            b"script" => Some(TextType::ScriptData),
            b"plaintext" => Some(TextType::PlainText),
            _ => None,
        }
    }
}

/// Lowercase `name` into `buf`. Returns `None` for names that cannot be one
/// of the known tags.
pub(crate) fn fold_tag_name<'b>(name: &[u8], buf: &'b mut [u8; MAX_KNOWN_TAG_LEN]) -> Option<&'b [u8]> {
    if name.len() > MAX_KNOWN_TAG_LEN {
        return None;
    }
    let out = &mut buf[..name.len()];
    for (dst, src) in out.iter_mut().zip(name) {
        *dst = src.to_ascii_lowercase();
    }
    Some(out)
}

pub fn is_html_void_tag(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"area"
            | b"base"
            | b"basefont"
            | b"bgsound"
            | b"br"
            | b"col"
            | b"embed"
            | b"hr"
            | b"img"
            | b"input"
            | b"keygen"
            | b"link"
            | b"meta"
            | b"param"
            | b"source"
            | b"track"
            | b"wbr"
    )
}

/// HTML start tags that close any open foreign content.
pub(crate) fn is_foreign_content_breakout(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"b" | b"big"
            | b"blockquote"
            | b"body"
            | b"br"
            | b"center"
            | b"code"
            | b"dd"
            | b"div"
            | b"dl"
            | b"dt"
            | b"em"
            | b"embed"
            | b"h1"
            | b"h2"
            | b"h3"
            | b"h4"
            | b"h5"
            | b"h6"
            | b"head"
            | b"hr"
            | b"i"
            | b"img"
            | b"li"
            | b"listing"
            | b"menu"
            | b"meta"
            | b"nobr"
            | b"ol"
            | b"p"
            | b"pre"
            | b"ruby"
            | b"s"
            | b"small"
            | b"span"
            | b"strong"
            | b"strike"
            | b"sub"
            | b"sup"
            | b"table"
            | b"tt"
            | b"u"
            | b"ul"
            | b"var"
    )
}

pub(crate) fn is_svg_html_integration_point(local_name: &[u8]) -> bool {
    matches!(local_name, b"foreignobject" | b"desc" | b"title")
}

pub(crate) fn is_mathml_text_integration_point(local_name: &[u8]) -> bool {
    matches!(local_name, b"mi" | b"mo" | b"mn" | b"ms" | b"mtext")
}
