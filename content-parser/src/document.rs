//! Parsed documents and their metadata.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use folio_directory_watcher::DocumentIdentity;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

/// Tag given to placeholder documents.
pub const ERROR_TAG: &str = "error";

/// Metadata declared in a document's front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Document title.
    pub title: String,

    /// Publication date; listings sort on it, newest first.
    pub date: DateTime<Utc>,

    /// Tags. Only membership matters.
    pub tags: BTreeSet<String>,

    /// Explicit excerpt, overriding the computed one.
    pub excerpt: Option<String>,

    /// Explicit image URL for listings.
    pub img: Option<String>,
}

impl DocumentMeta {
    /// Parse metadata from a JSON front matter body.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str::<RawMeta>(source)?.validate()
    }

    /// Parse metadata from a YAML front matter body.
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str::<RawMeta>(source)?.validate()
    }

    /// Check whether the metadata carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Front matter as written, before validation.
#[derive(Debug, Deserialize)]
struct RawMeta {
    title: Option<String>,
    date: Option<RawDate>,
    tags: Option<RawTags>,
    excerpt: Option<String>,
    img: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    /// Milliseconds since the Unix epoch.
    Millis(i64),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<RawTag>),
    One(RawTag),
}

/// A tag as written; `tags: [2024, rust]` is common.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for RawTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawTag::Text(text) => f.write_str(text),
            RawTag::Int(value) => write!(f, "{value}"),
            RawTag::Float(value) => write!(f, "{value}"),
            RawTag::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl RawMeta {
    fn validate(self) -> Result<DocumentMeta> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ParseError::MissingField("title"))?;

        let date = match self.date.ok_or(ParseError::MissingField("date"))? {
            RawDate::Text(text) => parse_date(&text)?,
            RawDate::Millis(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| ParseError::InvalidDate(millis.to_string()))?,
        };

        let tags = match self.tags {
            Some(RawTags::List(tags)) => tags,
            Some(RawTags::One(tag)) => vec![tag],
            None => Vec::new(),
        }
        .into_iter()
        .map(|tag| tag.to_string().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

        Ok(DocumentMeta {
            title,
            date,
            tags,
            excerpt: self.excerpt,
            img: self.img,
        })
    }
}

/// Parse a front matter date.
///
/// Accepts RFC 3339 and a few common naive forms, which are read as UTC.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(date.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
        .ok_or_else(|| ParseError::InvalidDate(text.to_string()))
}

/// A parsed document.
///
/// Documents are values: a change on disk produces a new one that replaces
/// the old wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Which file this came from.
    pub identity: DocumentIdentity,

    /// Front matter metadata.
    pub meta: DocumentMeta,

    /// The file contents as read.
    pub raw_source: String,

    /// Body rendered by the extension's transform.
    pub rendered_body: String,

    /// HTML prefix used in listings.
    pub excerpt_html: String,

    /// Plain-text excerpt.
    pub excerpt_text: String,

    /// Image to show next to the excerpt.
    pub excerpt_image_url: Option<String>,

    /// Whether the excerpt is shorter than the rendered body.
    pub truncated: bool,

    /// Why parsing failed, for placeholder documents.
    pub error: Option<String>,
}

impl Document {
    /// Base name of the source file.
    pub fn base(&self) -> &str {
        self.identity.base()
    }

    /// Whether this is a placeholder for a file that failed to parse.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
