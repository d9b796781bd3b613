//! Incremental HTML rewriting with bounded memory.
//!
//! ```
//! use html_rewriter::{
//!     ContentType, Directive, ElementContentHandlers, RewriterBuilder, Settings, rewrite_str,
//! };
//!
//! let mut builder = RewriterBuilder::new();
//! builder.on(
//!     &"a[href]".parse().unwrap(),
//!     ElementContentHandlers::default().element(|el| {
//!         el.set_attribute("rel", "nofollow").unwrap();
//!         el.append(" (external)", ContentType::Text);
//!         Directive::Continue
//!     }),
//! );
//! let output = rewrite_str("<a href=\"/x\">x</a>", builder, &Settings::default()).unwrap();
//! assert_eq!(output, "<a href=\"/x\" rel=\"nofollow\">x (external)</a>");
//! ```

pub use rewriter::*;
