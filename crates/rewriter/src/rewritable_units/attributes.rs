use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;
use html::AttributeToken;

use super::content::{decode, decode_lowercase, push_escaped_attribute_value};

/// An attribute of an [`super::Element`].
pub struct Attribute<'r> {
    name: Cow<'r, [u8]>,
    value: Cow<'r, [u8]>,
    /// Source text while the attribute is unmodified.
    raw: Option<&'r [u8]>,
    encoding: &'static Encoding,
}

impl<'r> Attribute<'r> {
    pub(crate) fn from_token(token: &AttributeToken<'r>, encoding: &'static Encoding) -> Self {
        Self {
            name: Cow::Borrowed(token.name),
            value: Cow::Borrowed(token.value),
            raw: Some(token.raw),
            encoding,
        }
    }

    pub(crate) fn new(name: Vec<u8>, value: Vec<u8>, encoding: &'static Encoding) -> Self {
        Self {
            name: Cow::Owned(name),
            value: Cow::Owned(value),
            raw: None,
            encoding,
        }
    }

    /// Lowercased name.
    pub fn name(&self) -> String {
        decode_lowercase(&self.name, self.encoding)
    }

    pub fn name_preserve_case(&self) -> String {
        decode(&self.name, self.encoding)
    }

    /// The value as written, without quotes. Character references are not
    /// decoded.
    pub fn value(&self) -> String {
        decode(&self.value, self.encoding)
    }

    pub(crate) fn has_name(&self, name: &[u8]) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub(crate) fn set_value(&mut self, value: Vec<u8>) {
        self.value = Cow::Owned(value);
        self.raw = None;
    }

    pub(crate) fn serialize_into(&self, out: &mut Vec<u8>) {
        match self.raw {
            Some(raw) => out.extend_from_slice(raw),
            None => {
                out.extend_from_slice(&self.name);
                out.extend_from_slice(b"=\"");
                push_escaped_attribute_value(&self.value, out);
                out.push(b'"');
            }
        }
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name_preserve_case())
            .field("value", &self.value())
            .finish()
    }
}
