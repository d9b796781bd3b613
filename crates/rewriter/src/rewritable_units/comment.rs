use std::any::Any;
use std::borrow::Cow;

use html::{CommentToken, SourceLocation};

use super::content::{ContentContext, decode, encode_exact};
use super::mutations::{Mutations, impl_content_mutations, impl_user_data};
use crate::errors::{InvalidMutationError, RewritingError};

/// A comment, including bogus comments such as `<?pi?>` and `</ x>`.
pub struct Comment<'r> {
    text: &'r [u8],
    new_text: Option<Vec<u8>>,
    raw: &'r [u8],
    location: SourceLocation,
    mutations: Mutations,
    user_data: Option<Box<dyn Any>>,
}

impl<'r> Comment<'r> {
    pub(crate) fn new(token: &CommentToken<'r>, ctx: &ContentContext) -> Self {
        Self {
            text: token.text,
            new_text: None,
            raw: token.raw,
            location: token.location,
            mutations: Mutations::new(ctx),
            user_data: None,
        }
    }

    pub fn text(&self) -> String {
        let bytes = self.new_text.as_deref().unwrap_or(self.text);
        decode(bytes, self.mutations.encoding())
    }

    /// Replace the comment text. The comment is then written as
    /// `<!--text-->` whatever its original form.
    pub fn set_text(&mut self, text: &str) -> Result<(), InvalidMutationError> {
        if text.contains("-->") {
            return Err(InvalidMutationError::CommentClosingSequence);
        }
        self.new_text = Some(encode_exact(text, self.mutations.encoding())?);
        Ok(())
    }

    pub fn source_location(&self) -> SourceLocation {
        self.location
    }

    pub(crate) fn flush(&mut self, output: &mut dyn FnMut(&[u8])) -> Result<(), RewritingError> {
        let serialized = match &self.new_text {
            Some(text) => {
                let mut comment = Vec::with_capacity(text.len() + 7);
                comment.extend_from_slice(b"<!--");
                comment.extend_from_slice(text);
                comment.extend_from_slice(b"-->");
                Cow::Owned(comment)
            }
            None => Cow::Borrowed(self.raw),
        };
        self.mutations.flush(&serialized, output)
    }
}

impl_content_mutations!(Comment);
impl_user_data!(Comment<'_>);

#[cfg(test)]
mod tests {
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use tools::mem::MemoryLimiter;

    use super::*;
    use crate::ContentType;

    fn with_comment(raw: &str, text: &str, f: impl FnOnce(&mut Comment<'_>)) -> String {
        let token = CommentToken {
            text: text.as_bytes(),
            raw: raw.as_bytes(),
            location: SourceLocation::new(0, raw.len()),
        };
        let ctx = ContentContext::new(UTF_8, MemoryLimiter::new_shared(usize::MAX));
        let mut comment = Comment::new(&token, &ctx);
        f(&mut comment);
        let mut out = Vec::new();
        comment
            .flush(&mut |chunk| out.extend_from_slice(chunk))
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn unmodified_comments_keep_their_form() {
        assert_eq!(with_comment("<!--x--!>", "x", |_| {}), "<!--x--!>");
        assert_eq!(with_comment("<?pi?>", "?pi?", |_| {}), "<?pi?>");
    }

    #[test]
    fn set_text_rewrites_the_comment() {
        let out = with_comment("<?pi?>", "?pi?", |c| {
            assert_eq!(c.text(), "?pi?");
            c.set_text("Yo").unwrap();
            assert_eq!(c.text(), "Yo");
        });
        assert_eq!(out, "<!--Yo-->");
    }

    #[test]
    fn set_text_rejects_the_closing_sequence() {
        let out = with_comment("<!--a-->", "a", |c| {
            assert_eq!(
                c.set_text("a-->b"),
                Err(InvalidMutationError::CommentClosingSequence)
            );
        });
        assert_eq!(out, "<!--a-->");
    }

    #[test]
    fn insertions_surround_the_comment() {
        let out = with_comment("<!--a-->", "a", |c| {
            c.before("1", ContentType::Html);
            c.before("2", ContentType::Html);
            c.after("4", ContentType::Html);
            c.after("3", ContentType::Html);
        });
        assert_eq!(out, "12<!--a-->34");
    }

    #[test]
    fn replace_and_remove() {
        assert_eq!(
            with_comment("<!--a-->", "a", |c| c.replace("<b>", ContentType::Text)),
            "&lt;b&gt;"
        );
        let out = with_comment("<!--a-->", "a", |c| {
            c.replace("x", ContentType::Html);
            c.remove();
            assert!(c.removed());
        });
        assert_eq!(out, "");
    }

    #[test]
    fn text_must_be_encodable() {
        let token = CommentToken {
            text: b"a",
            raw: b"<!--a-->",
            location: SourceLocation::new(0, 8),
        };
        let ctx = ContentContext::new(WINDOWS_1252, MemoryLimiter::new_shared(usize::MAX));
        let mut comment = Comment::new(&token, &ctx);
        assert_eq!(
            comment.set_text("\u{416}"),
            Err(InvalidMutationError::UnencodableCharacter)
        );
        assert!(comment.set_text("caf\u{e9}").is_ok());
        assert_eq!(comment.text(), "caf\u{e9}");
    }
}
