//! Single local file source

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use super::{Document, DocumentSource, SourceError};
use crate::error::{Error, Result};

/// A source holding exactly one file on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn not_found(&self) -> Error {
        Error::SourceNotFound(self.path.display().to_string())
    }
}

#[async_trait]
impl DocumentSource for LocalFileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn list(&self) -> Result<Vec<String>> {
        debug!(path = %self.path.display(), "LocalFileSource::list: called");
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.not_found()),
            Err(source) => {
                return Err(SourceError::Io {
                    path: self.path.clone(),
                    source,
                }
                .into());
            }
        };

        if !metadata.is_file() {
            return Err(SourceError::NotAFile(self.path.clone()).into());
        }
        Ok(vec![self.path.display().to_string()])
    }

    async fn fetch(&self, id: &str) -> Result<Document> {
        debug!(%id, "LocalFileSource::fetch: called");
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.not_found()),
            Err(source) => {
                return Err(SourceError::Io {
                    path: self.path.clone(),
                    source,
                }
                .into());
            }
        };
        Document::from_bytes(id, bytes)
    }
}
