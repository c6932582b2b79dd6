//! Source to sink pipeline
//!
//! Documents are processed one after another in listing order. Each document
//! is fetched, chunked, rewritten batch by batch, and appended to the sink
//! only once every batch succeeded. A failing document is recorded and the
//! run moves on to the next one.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::batcher::{Batch, plan_batches};
use crate::chunker::{Chunk, ChunkMode, chunk};
use crate::dispatch::{Dispatcher, DocumentReport};
use crate::error::{Error, Result};
use crate::sink::OutputSink;
use crate::source::{Document, DocumentSource};

/// A document that could not be rewritten
#[derive(Debug)]
pub struct DocumentFailure {
    pub id: String,
    pub error: Error,
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<DocumentReport>,
    pub failures: Vec<DocumentFailure>,
}

impl RunSummary {
    /// Documents attempted
    pub fn documents(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn words_in(&self) -> usize {
        self.reports.iter().map(|r| r.words_in).sum()
    }

    pub fn words_out(&self) -> usize {
        self.reports.iter().map(|r| r.words_out).sum()
    }

    pub fn batches(&self) -> usize {
        self.reports.iter().map(|r| r.batches).sum()
    }
}

/// Drives documents from a source through the dispatcher into a sink
pub struct Pipeline {
    source: Box<dyn DocumentSource>,
    dispatcher: Dispatcher,
    mode: ChunkMode,
}

impl Pipeline {
    pub fn new(source: Box<dyn DocumentSource>, dispatcher: Dispatcher, mode: ChunkMode) -> Self {
        Self {
            source,
            dispatcher,
            mode,
        }
    }

    /// Rewrite every listed document into `sink`
    ///
    /// Listing and sink failures end the run; anything else only fails the
    /// document it happened in.
    pub async fn run(&self, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        info!(source = %self.source.describe(), mode = %self.mode, "Starting rewrite");
        let ids = self.source.list().await?;
        debug!(count = ids.len(), "Pipeline::run: listed documents");

        let mut summary = RunSummary::default();
        for id in ids {
            info!(document = %id, "Processing document");
            match self.process(&id).await {
                Ok((output, report)) => {
                    sink.append(&output).map_err(Error::Sink)?;
                    info!(
                        document = %id,
                        batches = report.batches,
                        words_in = report.words_in,
                        words_out = report.words_out,
                        "Document rewritten"
                    );
                    summary.reports.push(report);
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!(document = %id, %error, "Document failed");
                    summary.failures.push(DocumentFailure { id, error });
                }
            }
        }

        info!(
            documents = summary.documents(),
            failed = summary.failures.len(),
            "Rewrite finished"
        );
        Ok(summary)
    }

    async fn process(&self, id: &str) -> Result<(String, DocumentReport)> {
        let document = self.source.fetch(id).await?;
        let mode = self.mode.resolve(document.id());
        let chunks = chunk(document.text(), mode, self.dispatcher.target());
        debug!(document = %id, %mode, chunk_count = chunks.len(), "Pipeline::process: chunked");
        self.dispatcher.rewrite_document(&document, &chunks).await
    }
}

/// Chunks and batches a document would be split into, without any rewrite call
#[derive(Debug, Serialize)]
pub struct DocumentPlan {
    pub id: String,
    pub mode: ChunkMode,
    pub target: usize,
    pub words: usize,
    pub chunks: Vec<Chunk>,
    pub batches: Vec<Batch>,
}

/// Plan a document's chunking and batching
pub fn plan(document: &Document, mode: ChunkMode, target: usize) -> DocumentPlan {
    debug!(id = %document.id(), %mode, target, "plan: called");
    let mode = mode.resolve(document.id());
    let chunks = chunk(document.text(), mode, target);
    let batches = plan_batches(&chunks, target);
    DocumentPlan {
        id: document.id().to_string(),
        mode,
        target,
        words: crate::chunker::word_count(document.text()),
        chunks,
        batches,
    }
}
