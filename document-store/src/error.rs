//! Error types for the document store and engine.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while building or reloading an engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Directory watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] folio_directory_watcher::WatcherError),

    /// Content parser error.
    #[error("parse error: {0}")]
    Parse(#[from] folio_content_parser::ParseError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration error.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}
