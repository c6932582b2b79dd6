//! Document chunking
//!
//! Splits a document into an ordered sequence of chunks, each bounded by a
//! target word count. Plain text is cut every `target` words. Markdown is cut
//! at heading and paragraph boundaries, and a fenced code block always stays
//! whole inside one chunk.

mod markdown;
mod plain;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use markdown::split_markdown;
pub use plain::split_plain;

/// File extensions that select markdown chunking in [`ChunkMode::Auto`]
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Count the words in a text
///
/// Words are runs of non-whitespace. Leading and trailing whitespace is
/// ignored, so an empty or blank string has zero words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// How a document is split into chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Pick per document from its identifier's extension
    #[default]
    Auto,
    /// Cut on word count alone
    Plain,
    /// Cut on headings and paragraphs, never inside code fences
    Markdown,
}

impl ChunkMode {
    /// Resolve `Auto` for a document identifier (path or repository file path)
    pub fn resolve(self, identifier: &str) -> ChunkMode {
        match self {
            ChunkMode::Auto => {
                let is_markdown = Path::new(identifier)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)))
                    .unwrap_or(false);
                debug!(%identifier, is_markdown, "ChunkMode::resolve: auto");
                if is_markdown { ChunkMode::Markdown } else { ChunkMode::Plain }
            }
            other => other,
        }
    }
}

impl std::str::FromStr for ChunkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "plain" | "text" => Ok(Self::Plain),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Unknown chunk mode: {}. Use: auto, plain, or markdown", s)),
        }
    }
}

impl std::fmt::Display for ChunkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkMode::Auto => write!(f, "auto"),
            ChunkMode::Plain => write!(f, "plain"),
            ChunkMode::Markdown => write!(f, "markdown"),
        }
    }
}

/// Structural position of a chunk within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChunkContext {
    /// Produced by plain-text splitting
    Plain,
    /// Starts with a heading of this level
    Section { level: u8 },
    /// Markdown content that does not start with a heading
    Body,
}

/// An ordered segment of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Trimmed chunk text
    pub text: String,
    /// Word count of `text`
    pub words: usize,
    /// Where the chunk sits in the document structure
    pub context: ChunkContext,
    /// Whether the chunk carries a code block
    pub has_code: bool,
}

impl Chunk {
    pub fn new(text: impl Into<String>, context: ChunkContext, has_code: bool) -> Self {
        let text = text.into();
        let words = word_count(&text);
        Self {
            text,
            words,
            context,
            has_code,
        }
    }
}

/// Split `text` into chunks of at most roughly `target` words
///
/// `Auto` has no identifier to resolve against here and falls back to plain
/// splitting; callers with a document identifier should resolve the mode first.
pub fn chunk(text: &str, mode: ChunkMode, target: usize) -> Vec<Chunk> {
    debug!(len = text.len(), %mode, target, "chunk: called");
    match mode {
        ChunkMode::Markdown => split_markdown(text, target),
        ChunkMode::Plain | ChunkMode::Auto => split_plain(text, target),
    }
}
