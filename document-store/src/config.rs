//! Configuration for a Folio engine.

use std::path::{Path, PathBuf};

use folio_directory_watcher::WatchConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Default number of documents per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Top-level configuration, usually read from a TOML file.
///
/// ```toml
/// [content]
/// dir = "posts"
/// extensions = ["md", "markdown"]
/// debounce_ms = 250
///
/// [listing]
/// page_size = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// The watched content directory.
    pub content: WatchConfig,

    /// Listing configuration.
    pub listing: ListingConfig,
}

impl FolioConfig {
    /// Create a configuration for `dir` with default settings.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            content: WatchConfig::new(dir),
            listing: ListingConfig::default(),
        }
    }

    /// Load a configuration file.
    ///
    /// A relative content directory is resolved against the file's own
    /// directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        if config.content.dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.content.dir = parent.join(&config.content.dir);
            }
        }

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the watch configuration.
    pub fn with_content(mut self, content: WatchConfig) -> Self {
        self.content = content;
        self
    }

    /// Set the listing configuration.
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.listing.page_size == 0 {
            return Err(StoreError::Config("listing.page_size must be at least 1".to_string()));
        }
        if self.content.extensions.is_empty() {
            return Err(StoreError::Config("content.extensions must not be empty".to_string()));
        }
        Ok(())
    }
}

/// How listings are paged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Documents per page.
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
