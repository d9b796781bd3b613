//! Strict-mode guard against start tags whose text mode depends on tree
//! construction.
//!
//! Inside `<select>` most text-switching tags are dropped by the tree builder,
//! so their content is regular markup; after `<frameset>` the same holds for
//! everything but `<noframes>`. The tokenizer cannot know what a browser would
//! do there, so in strict mode it refuses to guess.

use crate::error::ParsingAmbiguityError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum GuardState {
    #[default]
    Default,
    InSelect,
    InTemplateInSelect(u32),
    InOrAfterFrameset,
}

#[derive(Debug, Default)]
pub(crate) struct AmbiguityGuard {
    state: GuardState,
}

fn is_ambiguous_in_select(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"title" | b"plaintext" | b"style" | b"iframe" | b"xmp" | b"noembed" | b"noframes" | b"noscript"
    )
}

fn is_ambiguous_in_frameset(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"textarea"
            | b"title"
            | b"plaintext"
            | b"script"
            | b"style"
            | b"iframe"
            | b"xmp"
            | b"noembed"
            | b"noscript"
    )
}

fn ambiguity(local_name: &[u8]) -> ParsingAmbiguityError {
    ParsingAmbiguityError {
        tag_name: String::from_utf8_lossy(local_name).into_owned(),
    }
}

impl AmbiguityGuard {
    pub(crate) fn track_start_tag(&mut self, local_name: &[u8]) -> Result<(), ParsingAmbiguityError> {
        match self.state {
            GuardState::Default => match local_name {
                b"select" => self.state = GuardState::InSelect,
                b"frameset" => self.state = GuardState::InOrAfterFrameset,
                _ => {}
            },
            GuardState::InSelect => match local_name {
                b"template" => self.state = GuardState::InTemplateInSelect(1),
                b"select" | b"input" | b"keygen" | b"textarea" => self.state = GuardState::Default,
                name if is_ambiguous_in_select(name) => return Err(ambiguity(name)),
                _ => {}
            },
            GuardState::InTemplateInSelect(depth) => {
                if local_name == b"template" {
                    self.state = GuardState::InTemplateInSelect(depth.saturating_add(1));
                }
            }
            GuardState::InOrAfterFrameset => {
                if is_ambiguous_in_frameset(local_name) {
                    return Err(ambiguity(local_name));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn track_end_tag(&mut self, local_name: &[u8]) {
        match (self.state, local_name) {
            (GuardState::InSelect, b"select") => self.state = GuardState::Default,
            (GuardState::InTemplateInSelect(1), b"template") => self.state = GuardState::InSelect,
            (GuardState::InTemplateInSelect(depth), b"template") => {
                self.state = GuardState::InTemplateInSelect(depth - 1)
            }
            _ => {}
        }
    }
}
