//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use folio_document_store::{ConfigSource, FolioConfig, Result};

/// Watch a content directory and keep a parsed, sorted listing of it.
#[derive(Debug, Clone, Parser)]
#[command(name = "folio", version)]
pub struct Args {
    /// Path to a TOML configuration file, re-read on every reload
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Content directory (overrides the configuration file)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Quiet period in milliseconds before changes are applied
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

impl ConfigSource for Args {
    fn load(&self) -> Result<FolioConfig> {
        let mut config = match &self.config {
            Some(path) => FolioConfig::load(path)?,
            None => FolioConfig::default(),
        };

        if let Some(dir) = &self.dir {
            config.content.dir = dir.clone();
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.content.debounce_ms = debounce_ms;
        }

        config.validate()?;
        Ok(config)
    }
}
