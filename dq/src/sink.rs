//! Append-only output sinks

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination for rewritten text
pub trait OutputSink {
    /// Append `text` after everything written so far
    fn append(&mut self, text: &str) -> io::Result<()>;
}

/// Appends to a file, creating it on the first non-empty write
///
/// A run that never produces output leaves the filesystem untouched.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    bytes_written: u64,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            bytes_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            debug!(path = %self.path.display(), "FileSink::file: opening for append");
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("output file not open"))
    }
}

impl OutputSink for FileSink {
    fn append(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let file = self.file()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        self.bytes_written += text.len() as u64;
        Ok(())
    }
}

/// In-memory sink
impl OutputSink for String {
    fn append(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}
