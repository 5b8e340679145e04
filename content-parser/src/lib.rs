//! # Content Parser
//!
//! Turns a content file into a [`Document`]: front matter metadata, a body
//! rendered by the transform registered for the file's extension, and a
//! listing excerpt.
//!
//! ## Features
//!
//! - **Two Front Matter Styles**: a fenced JSON block or a `---` YAML block
//! - **Extension Dispatch**: one [`Transform`] per extension, markdown and
//!   plain text built in, anything else passed through; fenced shell code is
//!   highlighted
//! - **Excerpts**: `<!-- more -->` markers, explicit overrides, or a cut after
//!   the first media element or a few paragraphs
//! - **Fail-Soft Parsing**: [`ContentParser::parse`] never fails; broken files
//!   become placeholder documents tagged `error`
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_content_parser::ContentParser;
//!
//! let parser = ContentParser::with_builtin_transforms();
//! let document = parser.parse(&identity).await;
//! println!("{} ({})", document.meta.title, document.excerpt_text);
//! ```

pub mod document;
pub mod error;
pub mod excerpt;
pub mod front_matter;
mod highlight;
pub mod parser;
pub mod transform;

pub use document::{Document, DocumentMeta, ERROR_TAG, parse_date};
pub use error::{ParseError, Result};
pub use excerpt::{EXCERPT_PARAGRAPHS, EXCERPT_TEXT_CHARS, Excerpt};
pub use front_matter::{FrontMatter, FrontMatterFormat};
pub use parser::ContentParser;
pub use transform::{FnTransform, MarkdownTransform, PlainTextTransform, Transform, escape_html};
