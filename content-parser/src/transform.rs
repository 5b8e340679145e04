//! Extension-keyed body transforms.
//!
//! A transform turns the body of a source file into HTML. The parser looks
//! one up by file extension; unknown extensions pass through unchanged.

use async_trait::async_trait;
use folio_directory_watcher::DocumentIdentity;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::error::Result;
use crate::highlight;

/// Renders a document body to HTML.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Get the name of this transform, for diagnostics.
    fn name(&self) -> &str;

    /// Render `source` (the body, front matter removed) to HTML.
    async fn render(&self, source: &str, identity: &DocumentIdentity) -> Result<String>;
}

/// CommonMark rendering with figure images, anchored headings and
/// highlighted code blocks.
#[derive(Debug, Clone)]
pub struct MarkdownTransform {
    options: Options,
}

impl MarkdownTransform {
    /// Create a markdown transform with tables, footnotes, strikethrough and
    /// task lists enabled.
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }

    /// Render markdown synchronously.
    pub fn render_str(&self, source: &str) -> String {
        let mut parser = Parser::new_ext(source, self.options);
        let mut events: Vec<Event<'_>> = Vec::new();

        while let Some(event) = parser.next() {
            match event {
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    let alt = collect_text(&mut parser, |e| matches!(e, Event::End(TagEnd::Image)));
                    events.push(Event::Html(figure(&dest_url, &title, &alt).into()));
                }
                Event::Start(Tag::Heading { level, id, .. }) => {
                    let mut inner = Vec::new();
                    for event in parser.by_ref() {
                        if matches!(event, Event::End(TagEnd::Heading(_))) {
                            break;
                        }
                        inner.push(event);
                    }

                    let level = level as usize;
                    let slug = match id {
                        Some(id) => escape_html(&id),
                        None => slugify(&plain_text(&inner)),
                    };
                    events.push(Event::Html(
                        format!("<h{level} id=\"{slug}\"><a class=\"anchor\" href=\"#{slug}\">")
                            .into(),
                    ));
                    events.extend(inner);
                    events.push(Event::Html(CowStr::from(format!("</a></h{level}>\n"))));
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info,
                        CodeBlockKind::Indented => CowStr::Borrowed(""),
                    };
                    let mut code = String::new();
                    for event in parser.by_ref() {
                        match event {
                            Event::End(TagEnd::CodeBlock) => break,
                            Event::Text(text) => code.push_str(&text),
                            _ => {}
                        }
                    }
                    events.push(Event::Html(highlight::code_block(&info, &code).into()));
                }
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

impl Default for MarkdownTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transform for MarkdownTransform {
    fn name(&self) -> &str {
        "markdown"
    }

    async fn render(&self, source: &str, _identity: &DocumentIdentity) -> Result<String> {
        Ok(self.render_str(source))
    }
}

/// Escaped plain text inside `<pre>`.
#[derive(Debug, Clone, Default)]
pub struct PlainTextTransform;

#[async_trait]
impl Transform for PlainTextTransform {
    fn name(&self) -> &str {
        "plain-text"
    }

    async fn render(&self, source: &str, _identity: &DocumentIdentity) -> Result<String> {
        Ok(format!("<pre>{}</pre>", escape_html(source)))
    }
}

/// Adapts a synchronous function into a [`Transform`].
pub struct FnTransform<F> {
    name: String,
    render: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&str, &DocumentIdentity) -> Result<String> + Send + Sync,
{
    /// Wrap `render` under `name`.
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(&str, &DocumentIdentity) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn render(&self, source: &str, identity: &DocumentIdentity) -> Result<String> {
        (self.render)(source, identity)
    }
}

/// Escape text for inclusion in HTML content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a `String` never fails.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Turn heading text into an anchor slug.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn figure(src: &str, title: &str, alt: &str) -> String {
    let caption = if alt.is_empty() { title } else { alt };
    let mut html = format!(
        "<figure><img src=\"{}\" alt=\"{}\"",
        escape_html(src),
        escape_html(alt)
    );
    if !title.is_empty() {
        html.push_str(&format!(" title=\"{}\"", escape_html(title)));
    }
    html.push('>');
    if !caption.is_empty() {
        html.push_str(&format!("<figcaption>{}</figcaption>", escape_html(caption)));
    }
    html.push_str("</figure>");
    html
}

/// Consume events up to and including the one matching `end`, returning
/// their text.
fn collect_text<'a>(
    events: &mut impl Iterator<Item = Event<'a>>,
    end: impl Fn(&Event<'a>) -> bool,
) -> String {
    let mut inner = Vec::new();
    for event in events {
        if end(&event) {
            break;
        }
        inner.push(event);
    }
    plain_text(&inner)
}

fn plain_text(events: &[Event<'_>]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}
