//! Re-accumulation of chunks into rewrite-sized batches
//!
//! A batch grows while the cumulative word count stays at or under the target.
//! The chunk that would overflow it is deferred to the next batch, so a single
//! chunk larger than the target becomes its own oversized batch.

use serde::Serialize;
use tracing::debug;

use crate::chunker::Chunk;

/// Chunks joined for one rewrite call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Position of this batch in dispatch order (0-based)
    pub index: usize,
    /// Chunk texts, each followed by a newline
    pub text: String,
    /// Cumulative word count of the chunks
    pub words: usize,
    /// Number of chunks in the batch
    pub chunks: usize,
}

impl Batch {
    /// Whether the batch is over budget (only possible for a single chunk)
    pub fn is_oversized(&self, target: usize) -> bool {
        self.words > target
    }

    fn push(&mut self, chunk: &Chunk) {
        self.text.push_str(&chunk.text);
        self.text.push('\n');
        self.words += chunk.words;
        self.chunks += 1;
    }
}

/// Streaming batch builder
///
/// Feed chunks in document order with [`Batcher::push`]; a completed batch is
/// returned whenever the next chunk does not fit. Call [`Batcher::finish`] to
/// take the remainder.
#[derive(Debug)]
pub struct Batcher {
    target: usize,
    current: Batch,
    emitted: usize,
}

impl Batcher {
    pub fn new(target: usize) -> Self {
        debug!(target, "Batcher::new: called");
        Self {
            target,
            current: Batch::default(),
            emitted: 0,
        }
    }

    /// Add a chunk, returning the previous batch if this chunk overflowed it
    pub fn push(&mut self, chunk: &Chunk) -> Option<Batch> {
        if self.current.words + chunk.words <= self.target {
            self.current.push(chunk);
            return None;
        }

        debug!(
            current_words = self.current.words,
            chunk_words = chunk.words,
            target = self.target,
            "Batcher::push: chunk overflows batch"
        );
        let done = self.take();
        self.current.push(chunk);
        done
    }

    /// Take the final non-empty batch
    pub fn finish(mut self) -> Option<Batch> {
        self.take()
    }

    fn take(&mut self) -> Option<Batch> {
        if self.current.chunks == 0 {
            return None;
        }
        let next = Batch {
            index: self.emitted + 1,
            ..Batch::default()
        };
        self.emitted += 1;
        Some(std::mem::replace(&mut self.current, next))
    }
}

/// Batch a whole chunk sequence up front
pub fn plan_batches(chunks: &[Chunk], target: usize) -> Vec<Batch> {
    let mut batcher = Batcher::new(target);
    let mut batches: Vec<Batch> = chunks.iter().filter_map(|chunk| batcher.push(chunk)).collect();
    batches.extend(batcher.finish());
    batches
}
