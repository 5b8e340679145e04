//! Splitting a source file into its metadata header and body.
//!
//! Two header styles are recognised at the start of the (trimmed) file:
//!
//! ```text
//! ```meta                      ---
//! {"title": "..."}             title: ...
//! ```                          ---
//! body...                      body...
//! ```

use crate::document::DocumentMeta;
use crate::error::{ParseError, Result};

const FENCE: &str = "```";
const DASHES: &str = "---";

/// How the header is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterFormat {
    /// A backtick fence with a language tag, holding JSON.
    Json,
    /// A block between `---` lines, holding YAML.
    Yaml,
}

/// A source file split into header and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Header encoding.
    pub format: FrontMatterFormat,

    /// Language tag of a fenced header (empty for YAML).
    pub tag: &'a str,

    /// Raw header text between the delimiters.
    pub header: &'a str,

    /// Everything after the closing delimiter.
    pub body: &'a str,
}

impl<'a> FrontMatter<'a> {
    /// Split `source` into header and body.
    pub fn split(source: &'a str) -> Result<Self> {
        let trimmed = source.trim();
        let (first_line, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
        let first_line = first_line.trim_end();

        let (format, tag, delimiter) = if let Some(tag) = first_line.strip_prefix(FENCE) {
            (FrontMatterFormat::Json, tag.trim(), FENCE)
        } else if first_line == DASHES {
            (FrontMatterFormat::Yaml, "", DASHES)
        } else {
            return Err(ParseError::MissingFrontMatter);
        };

        let (header, body) =
            split_at_closing(rest, delimiter).ok_or(ParseError::UnterminatedFrontMatter(delimiter))?;

        Ok(Self {
            format,
            tag,
            header,
            body: body.trim_start_matches(['\r', '\n']),
        })
    }

    /// Parse the header into metadata.
    pub fn meta(&self) -> Result<DocumentMeta> {
        match self.format {
            FrontMatterFormat::Json => DocumentMeta::from_json(self.header),
            FrontMatterFormat::Yaml => DocumentMeta::from_yaml(self.header),
        }
    }
}

/// Find the first line consisting of `delimiter` and split around it.
fn split_at_closing<'a>(text: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
