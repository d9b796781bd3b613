//! Encoding guard: only encodings that agree with ASCII on bytes 0x00-0x7F can
//! be scanned byte-wise for markup.

use encoding_rs::{Encoding, UTF_8};

use crate::error::EncodingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsciiCompatibleEncoding(&'static Encoding);

impl AsciiCompatibleEncoding {
    pub fn new(encoding: &'static Encoding) -> Result<Self, EncodingError> {
        if encoding.is_ascii_compatible() {
            Ok(Self(encoding))
        } else {
            Err(EncodingError::NonAsciiCompatible {
                name: encoding.name(),
            })
        }
    }

    /// Resolve a WHATWG encoding label such as `"utf-8"` or `"windows-1251"`.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        let encoding =
            Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| EncodingError::UnknownLabel {
                label: label.to_owned(),
            })?;
        Self::new(encoding)
    }

    pub fn utf_8() -> Self {
        Self(UTF_8)
    }

    pub fn encoding(self) -> &'static Encoding {
        self.0
    }

    pub fn name(self) -> &'static str {
        self.0.name()
    }

    pub fn is_utf8(self) -> bool {
        self.0 == UTF_8
    }
}

impl Default for AsciiCompatibleEncoding {
    fn default() -> Self {
        Self::utf_8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_compatible_labels() {
        for label in ["utf-8", "UTF8", "windows-1252", "latin1", "shift_jis", "gbk", " koi8-r "] {
            assert!(
                AsciiCompatibleEncoding::for_label(label).is_ok(),
                "label {label:?} should be accepted"
            );
        }
        assert!(AsciiCompatibleEncoding::for_label("utf-8").unwrap().is_utf8());
    }

    #[test]
    fn rejects_non_ascii_compatible_encodings() {
        for label in ["utf-16", "utf-16be", "utf-16le", "iso-2022-jp", "replacement"] {
            let err = AsciiCompatibleEncoding::for_label(label).unwrap_err();
            assert!(
                matches!(err, EncodingError::NonAsciiCompatible { .. }),
                "label {label:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_labels() {
        let err = AsciiCompatibleEncoding::for_label("klingon").unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnknownLabel {
                label: "klingon".to_string()
            }
        );
    }
}
