//! Configuration types for directory watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration for a watched content directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Path to the directory.
    pub dir: PathBuf,

    /// File extensions (without the dot) that count as documents.
    pub extensions: Vec<String>,

    /// Optional regular expression the file name must also match.
    pub pattern: Option<String>,

    /// How long the directory must stay quiet before a settle cycle runs.
    pub debounce_ms: u64,
}

impl WatchConfig {
    /// Create a new watch config for `dir` with default matching rules.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["md".to_string()],
            pattern: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Replace the accepted extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Require file names to match a regular expression.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the debounce window.
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Compile the name matcher described by this config.
    pub fn matcher(&self) -> Result<NameMatcher> {
        NameMatcher::new(&self.extensions, self.pattern.as_deref())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new("./article")
    }
}

/// Decides which file names in the watched directory are documents.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    extensions: Vec<String>,
    pattern: Option<Regex>,
}

impl NameMatcher {
    /// Build a matcher from an extension list and an optional regex.
    pub fn new(extensions: &[String], pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern.map(Regex::new).transpose()?;
        Ok(Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            pattern,
        })
    }

    /// Check whether a bare file name is a document.
    ///
    /// Names without an extension never match.
    pub fn matches(&self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        if ext.is_empty() {
            return false;
        }

        let ext = ext.to_lowercase();
        if !self.extensions.iter().any(|e| *e == ext) {
            return false;
        }

        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(file_name))
    }

    /// Check whether a path's file name is a document.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.matches(name))
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            pattern: None,
        }
    }
}
