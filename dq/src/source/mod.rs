//! Document sources
//!
//! A source enumerates document identifiers in traversal order and reads each
//! one into a [`Document`]. The pipeline only sees the [`DocumentSource`]
//! trait, never the concrete origin.

use async_trait::async_trait;
use tracing::debug;

mod error;
mod github;
mod local;

pub use error::SourceError;
pub use github::{GithubLocation, GithubSource};
pub use local::LocalFileSource;

use crate::error::{Error, Result};

/// A document's identifier and decoded text, immutable once read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Decode raw bytes as UTF-8 text
    pub fn from_bytes(id: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let id = id.into();
        debug!(%id, len = bytes.len(), "Document::from_bytes: called");
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Self { id, text }),
            Err(e) => Err(Error::Parse {
                document: id,
                reason: e.utf8_error().to_string(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the document holds no words at all
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Where documents come from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable description for logs and status output
    fn describe(&self) -> String;

    /// Identifiers of every document, in traversal order
    async fn list(&self) -> Result<Vec<String>>;

    /// Read one listed document
    async fn fetch(&self, id: &str) -> Result<Document>;
}
