//! The content parser: file bytes in, [`Document`] out.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use folio_directory_watcher::DocumentIdentity;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentMeta, ERROR_TAG};
use crate::error::{ParseError, Result};
use crate::excerpt::{EXCERPT_TEXT_CHARS, Excerpt, plain_text};
use crate::front_matter::FrontMatter;
use crate::transform::{MarkdownTransform, PlainTextTransform, Transform, escape_html};

/// Turns source files into documents, dispatching bodies to transforms by
/// extension.
///
/// The parser holds no mutable state once configured, so a single instance
/// can be shared behind an `Arc` and used for concurrent parses.
#[derive(Clone, Default)]
pub struct ContentParser {
    /// Transforms keyed by lower-cased extension.
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl ContentParser {
    /// Create a parser with no transforms; every body passes through as-is.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with markdown (`md`, `markdown`) and plain text
    /// (`txt`) registered.
    pub fn with_builtin_transforms() -> Self {
        let markdown: Arc<dyn Transform> = Arc::new(MarkdownTransform::new());
        let mut parser = Self::new();
        parser.register("md", Arc::clone(&markdown));
        parser.register("markdown", markdown);
        parser.register("txt", Arc::new(PlainTextTransform));
        parser
    }

    /// Register `transform` for `ext`, returning the transform it replaces.
    pub fn register(
        &mut self,
        ext: impl Into<String>,
        transform: Arc<dyn Transform>,
    ) -> Option<Arc<dyn Transform>> {
        let ext = ext.into().to_lowercase();
        let name = transform.name().to_string();
        let previous = self.transforms.insert(ext.clone(), transform);
        match &previous {
            Some(old) => info!("Transform {name} replaces {} for .{ext}", old.name()),
            None => debug!("Registered transform {name} for .{ext}"),
        }
        previous
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_transform(mut self, ext: impl Into<String>, transform: Arc<dyn Transform>) -> Self {
        self.register(ext, transform);
        self
    }

    /// Look up the transform for an extension.
    pub fn transform_for(&self, ext: &str) -> Option<&Arc<dyn Transform>> {
        self.transforms.get(&ext.to_lowercase())
    }

    /// Extensions with a registered transform, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Parse a file, never failing.
    ///
    /// Any error yields a placeholder document tagged `error` that describes
    /// the failure, so one bad file cannot take a listing down.
    pub async fn parse(&self, identity: &DocumentIdentity) -> Document {
        let raw_source = match read_source(identity).await {
            Ok(raw_source) => raw_source,
            Err(e) => {
                warn!("Failed to read {}: {e}", identity.path().display());
                return placeholder(identity, String::new(), &e);
            }
        };

        match self.build(identity.clone(), raw_source.clone()).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to parse {}: {e}", identity.path().display());
                placeholder(identity, raw_source, &e)
            }
        }
    }

    /// Parse a file, returning the first error encountered.
    pub async fn try_parse(&self, identity: &DocumentIdentity) -> Result<Document> {
        let raw_source = read_source(identity).await?;
        self.build(identity.clone(), raw_source).await
    }

    /// Parse in-memory source as if it were a file with extension `ext`.
    pub async fn preview(&self, ext: &str, source: &str) -> Result<Document> {
        let identity = DocumentIdentity::resolve(Path::new(""), &format!("preview.{ext}"));
        self.build(identity, source.to_string()).await
    }

    async fn build(&self, identity: DocumentIdentity, raw_source: String) -> Result<Document> {
        let front = FrontMatter::split(&raw_source)?;
        let meta = front.meta()?;
        let rendered_body = self.render(front.body, &identity).await?;
        let excerpt = Excerpt::compute(&meta, &rendered_body);

        Ok(Document {
            identity,
            meta,
            raw_source,
            rendered_body,
            excerpt_html: excerpt.html,
            excerpt_text: excerpt.text,
            excerpt_image_url: excerpt.image_url,
            truncated: excerpt.truncated,
            error: None,
        })
    }

    async fn render(&self, body: &str, identity: &DocumentIdentity) -> Result<String> {
        match self.transform_for(identity.ext()) {
            Some(transform) => transform.render(body, identity).await,
            None => {
                debug!("No transform for .{}; passing {identity} through", identity.ext());
                Ok(body.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ContentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentParser")
            .field("extensions", &self.extensions())
            .finish()
    }
}

async fn read_source(identity: &DocumentIdentity) -> Result<String> {
    tokio::fs::read_to_string(identity.path())
        .await
        .map_err(|source| ParseError::Read {
            path: identity.path().display().to_string(),
            source,
        })
}

/// A document standing in for a file that failed to parse.
fn placeholder(identity: &DocumentIdentity, raw_source: String, error: &ParseError) -> Document {
    let message = error.to_string();
    let body = format!(
        "<pre>Error when parsing:\n{}\n{}</pre>",
        escape_html(&identity.path().display().to_string()),
        escape_html(&message)
    );

    Document {
        identity: identity.clone(),
        meta: DocumentMeta {
            title: format!("Error Parsing {}", identity.file_name()),
            date: Utc::now(),
            tags: BTreeSet::from([ERROR_TAG.to_string()]),
            excerpt: None,
            img: None,
        },
        raw_source,
        excerpt_html: body.clone(),
        excerpt_text: plain_text(&body, EXCERPT_TEXT_CHARS),
        rendered_body: body,
        excerpt_image_url: None,
        truncated: false,
        error: Some(message),
    }
}
