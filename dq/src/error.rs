//! Crate-level error type

use thiserror::Error;

use crate::llm::LlmError;
use crate::source::SourceError;

/// Errors surfaced by the rewrite pipeline
#[derive(Debug, Error)]
pub enum Error {
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to parse {document}: {reason}")]
    Parse { document: String, reason: String },

    #[error("Rewrite call failed for {document} (batch {batch}): {source}")]
    RewriteCall {
        document: String,
        batch: usize,
        #[source]
        source: LlmError,
    },

    #[error("Failed to write output: {0}")]
    Sink(#[source] std::io::Error),
}

impl Error {
    /// Whether the error ends the whole run rather than one document
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Sink(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
