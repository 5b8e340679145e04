//! Syntax highlighting for fenced code blocks.

use std::sync::LazyLock;

use tracing::warn;
use tree_sitter_highlight::{Highlight, HighlightConfiguration, HighlightEvent, Highlighter};

use crate::transform::escape_html;

/// Capture names we style, emitted as `hljs-<name>` classes.
const HIGHLIGHT_NAMES: [&str; 11] = [
    "comment",
    "constant",
    "embedded",
    "function",
    "keyword",
    "number",
    "operator",
    "property",
    "punctuation",
    "string",
    "variable",
];

static BASH: LazyLock<Option<HighlightConfiguration>> = LazyLock::new(|| {
    let mut config = match HighlightConfiguration::new(
        tree_sitter_bash::LANGUAGE.into(),
        "bash",
        tree_sitter_bash::HIGHLIGHT_QUERY,
        "",
        "",
    ) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load the bash highlight query: {e}");
            return None;
        }
    };
    config.configure(&HIGHLIGHT_NAMES);
    Some(config)
});

fn config_for(lang: &str) -> Option<&'static HighlightConfiguration> {
    match lang {
        "bash" | "sh" | "shell" | "zsh" => BASH.as_ref(),
        _ => None,
    }
}

/// Render a code block as `<pre class="hljs">`.
///
/// `info` is the fence's info string; its first word names the language.
/// Languages without a grammar are escaped but not highlighted.
pub fn code_block(info: &str, code: &str) -> String {
    let lang = info
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let body = highlight(&lang, code).unwrap_or_else(|| escape_html(code));

    if lang.is_empty() {
        return format!("<pre class=\"hljs\"><code>{body}</code></pre>\n");
    }
    let lang = escape_html(&lang);
    format!(
        "<pre class=\"hljs\"><code class=\"lang-{lang}\" data-language=\"{lang}\">{body}</code></pre>\n"
    )
}

fn highlight(lang: &str, code: &str) -> Option<String> {
    let config = config_for(lang)?;
    let source = code.as_bytes();
    let mut highlighter = Highlighter::new();
    let events = match highlighter.highlight(config, source, None, |_| None) {
        Ok(events) => events,
        Err(e) => {
            warn!("Failed to highlight {lang} code: {e}");
            return None;
        }
    };

    let mut out = String::with_capacity(code.len() * 2);
    for event in events {
        match event {
            Ok(HighlightEvent::Source { start, end }) => {
                out.push_str(&escape_html(&String::from_utf8_lossy(&source[start..end])));
            }
            Ok(HighlightEvent::HighlightStart(Highlight(index))) => {
                let name = HIGHLIGHT_NAMES.get(index).copied().unwrap_or("plain");
                out.push_str(&format!("<span class=\"hljs-{name}\">"));
            }
            Ok(HighlightEvent::HighlightEnd) => out.push_str("</span>"),
            Err(e) => {
                warn!("Failed to highlight {lang} code: {e}");
                return None;
            }
        }
    }
    Some(out)
}
