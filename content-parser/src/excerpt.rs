//! Listing excerpts computed from a rendered body.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::DocumentMeta;

/// Paragraphs kept when no marker or media element cuts the excerpt sooner.
pub const EXCERPT_PARAGRAPHS: usize = 5;

/// Maximum length, in characters, of the plain-text excerpt.
pub const EXCERPT_TEXT_CHARS: usize = 150;

#[allow(clippy::unwrap_used)]
static MORE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<!--\s*more\s*-->").unwrap());

#[allow(clippy::unwrap_used)]
static MEDIA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<figure\b.*?</figure>|<img\b[^>]*>").unwrap());

#[allow(clippy::unwrap_used)]
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']*)["']"#).unwrap());

#[allow(clippy::unwrap_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// The listing view of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    /// HTML prefix of the body, or the explicit excerpt.
    pub html: String,

    /// Tag-free text, capped at [`EXCERPT_TEXT_CHARS`].
    pub text: String,

    /// Explicit image, or the first image in the body.
    pub image_url: Option<String>,

    /// Whether `html` is shorter than the body.
    pub truncated: bool,
}

impl Excerpt {
    /// Compute the excerpt for a rendered body.
    ///
    /// A `<!-- more -->` marker wins. Otherwise an explicit `excerpt` in the
    /// metadata is used as-is. Otherwise the body is cut after the first media
    /// element or after [`EXCERPT_PARAGRAPHS`] paragraphs, whichever comes
    /// first.
    pub fn compute(meta: &DocumentMeta, body: &str) -> Self {
        let (html, text) = match (MORE_MARKER.find(body), &meta.excerpt) {
            (Some(marker), _) => {
                let html = body[..marker.start()].trim_end().to_string();
                let text = plain_text(&html, EXCERPT_TEXT_CHARS);
                (html, text)
            }
            (None, Some(excerpt)) => (excerpt.clone(), excerpt.clone()),
            (None, None) => {
                let html = body[..auto_cut(body)].to_string();
                let text = plain_text(&html, EXCERPT_TEXT_CHARS);
                (html, text)
            }
        };

        let image_url = meta.img.clone().or_else(|| {
            IMG_SRC
                .captures(body)
                .and_then(|caps| caps.get(1))
                .map(|src| src.as_str().to_string())
        });

        Self {
            text,
            truncated: html.len() < body.len(),
            html,
            image_url,
        }
    }
}

/// Byte offset where an automatic excerpt ends.
fn auto_cut(body: &str) -> usize {
    let media_end = MEDIA.find(body).map(|m| close_paragraph(body, m.end()));
    let paragraphs_end = body
        .match_indices("</p>")
        .take(EXCERPT_PARAGRAPHS)
        .last()
        .map(|(start, close)| start + close.len());

    let cut = match (media_end, paragraphs_end) {
        (Some(media), Some(paragraphs)) => media.min(paragraphs),
        (Some(end), None) | (None, Some(end)) => end,
        (None, None) => body.len(),
    };

    // Trailing whitespace alone does not make a body longer than its excerpt.
    if body[cut..].trim().is_empty() {
        body.len()
    } else {
        cut
    }
}

/// Extend `end` past a `</p>` that immediately follows it, so a cut after an
/// image wrapped in a paragraph keeps the paragraph closed.
fn close_paragraph(body: &str, end: usize) -> usize {
    let rest = &body[end..];
    match rest.trim_start().strip_prefix("</p>") {
        Some(after) => body.len() - after.len(),
        None => end,
    }
}

/// Strip tags and collapse whitespace, keeping at most `limit` characters.
pub fn plain_text(html: &str, limit: usize) -> String {
    let stripped = TAG.replace_all(html, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(limit) {
        Some((end, _)) => collapsed[..end].trim_end().to_string(),
        None => collapsed,
    }
}
