//! Source error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while listing or reading documents
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid repository URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),
}
