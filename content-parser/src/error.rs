//! Error types for content parsing.

use thiserror::Error;

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while turning a file into a document.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No front matter block opens the file.
    #[error("no front matter found; start the file with a ```meta fence or a --- block")]
    MissingFrontMatter,

    /// A front matter block was opened but never closed.
    #[error("front matter opened with {0} is never closed")]
    UnterminatedFrontMatter(&'static str),

    /// JSON front matter failed to parse.
    #[error("invalid JSON front matter: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML front matter failed to parse.
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required front matter field is missing or empty.
    #[error("front matter field `{0}` is required")]
    MissingField(&'static str),

    /// The date field is not in a recognised format.
    #[error("unrecognised date: {0}")]
    InvalidDate(String),

    /// A registered transform failed.
    #[error("transform `{name}` failed: {message}")]
    Transform { name: String, message: String },
}

impl ParseError {
    /// Build a transform failure.
    pub fn transform(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transform {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
