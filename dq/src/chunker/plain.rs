//! Word-count splitting for unstructured text

use tracing::debug;

use super::{Chunk, ChunkContext};

/// Split text into chunks of exactly `target` words, plus a shorter remainder
///
/// Whitespace runs collapse to a single space. A `target` of zero is treated
/// as one so that every chunk holds at least one word.
pub fn split_plain(text: &str, target: usize) -> Vec<Chunk> {
    let target = target.max(1);
    debug!(len = text.len(), target, "split_plain: called");

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        if current.len() >= target {
            chunks.push(Chunk::new(current.join(" "), ChunkContext::Plain, false));
            current.clear();
        }
    }

    if !current.is_empty() {
        debug!(words = current.len(), "split_plain: pushing remainder");
        chunks.push(Chunk::new(current.join(" "), ChunkContext::Plain, false));
    }

    debug!(chunk_count = chunks.len(), "split_plain: done");
    chunks
}
