//! Just enough tree-construction state to lex correctly: the namespace of the
//! current content (HTML, SVG, MathML), integration points where HTML resumes
//! inside foreign content, and text-mode switches after raw-text start tags.

use crate::error::ParsingAmbiguityError;
use crate::names::{
    MAX_KNOWN_TAG_LEN, Namespace, TextType, fold_tag_name, is_foreign_content_breakout,
    is_html_void_tag, is_mathml_text_integration_point, is_svg_html_integration_point,
};
use crate::token::AttributeToken;

use super::ambiguity_guard::AmbiguityGuard;

/// What the tokenizer needs to know about a start tag it just lexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StartTagFeedback {
    pub(crate) namespace: Namespace,
    pub(crate) can_have_content: bool,
    pub(crate) text_type: Option<TextType>,
}

/// An open foreign element, or an integration point inside one.
#[derive(Debug)]
struct ForeignFrame {
    local_name: Vec<u8>,
    content_namespace: Namespace,
}

#[derive(Debug)]
pub(crate) struct TreeBuilderSimulator {
    frames: Vec<ForeignFrame>,
    guard: AmbiguityGuard,
    strict: bool,
}

impl TreeBuilderSimulator {
    pub(crate) fn new(strict: bool) -> Self {
        Self {
            frames: Vec::new(),
            guard: AmbiguityGuard::default(),
            strict,
        }
    }

    pub(crate) fn current_namespace(&self) -> Namespace {
        self.frames
            .last()
            .map_or(Namespace::Html, |frame| frame.content_namespace)
    }

    pub(crate) fn in_foreign_content(&self) -> bool {
        self.current_namespace() != Namespace::Html
    }

    pub(crate) fn on_start_tag(
        &mut self,
        name: &[u8],
        attributes: &[AttributeToken<'_>],
        self_closing: bool,
    ) -> Result<StartTagFeedback, ParsingAmbiguityError> {
        let mut buf = [0u8; MAX_KNOWN_TAG_LEN];
        let known = fold_tag_name(name, &mut buf);

        if self.in_foreign_content() {
            let breakout = match known {
                Some(b"font") => attributes.iter().any(|attr| {
                    [&b"color"[..], &b"face"[..], &b"size"[..]]
                        .iter()
                        .any(|n| attr.name.eq_ignore_ascii_case(n))
                }),
                Some(local) => is_foreign_content_breakout(local),
                None => false,
            };
            if !breakout {
                return Ok(self.foreign_start_tag(name, known, attributes, self_closing));
            }
            while self.in_foreign_content() {
                self.frames.pop();
            }
        }

        self.html_start_tag(name, known, self_closing)
    }

    fn html_start_tag(
        &mut self,
        name: &[u8],
        known: Option<&[u8]>,
        self_closing: bool,
    ) -> Result<StartTagFeedback, ParsingAmbiguityError> {
        let namespace = match known {
            Some(b"svg") => Namespace::Svg,
            Some(b"math") => Namespace::MathMl,
            _ => Namespace::Html,
        };
        if namespace != Namespace::Html {
            if !self_closing {
                self.frames.push(ForeignFrame {
                    local_name: name.to_ascii_lowercase(),
                    content_namespace: namespace,
                });
            }
            return Ok(StartTagFeedback {
                namespace,
                can_have_content: !self_closing,
                text_type: None,
            });
        }

        let Some(local) = known else {
            return Ok(StartTagFeedback {
                namespace,
                can_have_content: true,
                text_type: None,
            });
        };

        if let Err(err) = self.guard.track_start_tag(local) {
            if self.strict {
                return Err(err);
            }
            log::warn!(target: "html.tokenizer", "{err}; continuing with a best guess");
        }

        Ok(StartTagFeedback {
            namespace,
            can_have_content: !is_html_void_tag(local),
            text_type: TextType::for_html_start_tag(local),
        })
    }

    fn foreign_start_tag(
        &mut self,
        name: &[u8],
        known: Option<&[u8]>,
        attributes: &[AttributeToken<'_>],
        self_closing: bool,
    ) -> StartTagFeedback {
        let parent = self.current_namespace();
        let namespace = match known {
            Some(b"svg") => Namespace::Svg,
            Some(b"math") => Namespace::MathMl,
            _ => parent,
        };

        if !self_closing {
            let integration_point = match (namespace, known) {
                (Namespace::Svg, Some(local)) => is_svg_html_integration_point(local),
                (Namespace::MathMl, Some(b"annotation-xml")) => attributes.iter().any(|attr| {
                    attr.name.eq_ignore_ascii_case(b"encoding")
                        && (attr.value.eq_ignore_ascii_case(b"text/html")
                            || attr.value.eq_ignore_ascii_case(b"application/xhtml+xml"))
                }),
                (Namespace::MathMl, Some(local)) => is_mathml_text_integration_point(local),
                _ => false,
            };
            self.frames.push(ForeignFrame {
                local_name: name.to_ascii_lowercase(),
                content_namespace: if integration_point {
                    Namespace::Html
                } else {
                    namespace
                },
            });
        }

        StartTagFeedback {
            namespace,
            can_have_content: !self_closing,
            text_type: None,
        }
    }

    pub(crate) fn on_end_tag(&mut self, name: &[u8]) {
        let mut buf = [0u8; MAX_KNOWN_TAG_LEN];
        if let Some(local) = fold_tag_name(name, &mut buf) {
            self.guard.track_end_tag(local);
        }
        if let Some(index) = self
            .frames
            .iter()
            .rposition(|frame| frame.local_name.eq_ignore_ascii_case(name))
        {
            self.frames.truncate(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(sim: &mut TreeBuilderSimulator, name: &str) -> StartTagFeedback {
        sim.on_start_tag(name.as_bytes(), &[], false).unwrap()
    }

    #[test]
    fn svg_content_is_foreign_until_closed() {
        let mut sim = TreeBuilderSimulator::new(true);
        assert_eq!(start(&mut sim, "svg").namespace, Namespace::Svg);
        let inner = start(&mut sim, "script");
        assert_eq!(inner.namespace, Namespace::Svg);
        assert_eq!(inner.text_type, None);
        sim.on_end_tag(b"script");
        sim.on_end_tag(b"svg");
        assert_eq!(start(&mut sim, "script").text_type, Some(TextType::ScriptData));
    }

    #[test]
    fn self_closing_foreign_elements_have_no_content() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "svg");
        let rect = sim.on_start_tag(b"rect", &[], true).unwrap();
        assert!(!rect.can_have_content);
        assert_eq!(sim.current_namespace(), Namespace::Svg);

        let html_div = sim.on_start_tag(b"div", &[], true).unwrap();
        assert_eq!(html_div.namespace, Namespace::Html);
        assert!(html_div.can_have_content);
    }

    #[test]
    fn integration_points_switch_back_to_html() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "svg");
        start(&mut sim, "foreignObject");
        assert_eq!(sim.current_namespace(), Namespace::Html);
        assert_eq!(start(&mut sim, "style").text_type, Some(TextType::RawText));
        sim.on_end_tag(b"style");
        sim.on_end_tag(b"foreignobject");
        assert_eq!(sim.current_namespace(), Namespace::Svg);
    }

    #[test]
    fn breakout_tags_leave_foreign_content() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "math");
        start(&mut sim, "mrow");
        let p = start(&mut sim, "p");
        assert_eq!(p.namespace, Namespace::Html);
        assert!(!sim.in_foreign_content());
    }

    #[test]
    fn strict_mode_rejects_text_tags_in_select() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "select");
        let err = sim.on_start_tag(b"style", &[], false).unwrap_err();
        assert_eq!(err.tag_name, "style");

        let mut lenient = TreeBuilderSimulator::new(false);
        start(&mut lenient, "select");
        assert_eq!(
            start(&mut lenient, "style").text_type,
            Some(TextType::RawText)
        );
    }

    #[test]
    fn select_end_tag_clears_the_guard() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "select");
        sim.on_end_tag(b"select");
        assert!(sim.on_start_tag(b"title", &[], false).is_ok());
    }

    #[test]
    fn frameset_makes_text_tags_ambiguous() {
        let mut sim = TreeBuilderSimulator::new(true);
        start(&mut sim, "frameset");
        assert!(sim.on_start_tag(b"noframes", &[], false).is_ok());
        assert!(sim.on_start_tag(b"script", &[], false).is_err());
    }
}
