//! Structure-aware splitting for markdown documents
//!
//! Walks the CommonMark event stream and grows one chunk buffer:
//!
//! - a heading always starts a new chunk and is written with its `#` marker
//! - a paragraph, list item or code block starts a new chunk only once the
//!   buffer has reached the target
//! - a code block is copied whole into one chunk, fence and all
//!
//! Inline content is copied from the source one line at a time, so emphasis,
//! links and inline code keep their markup while block quote markers and list
//! indentation are left behind.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use tracing::debug;

use super::{Chunk, ChunkContext, word_count};

/// Fence used for indented code blocks and unreadable fence markers
const DEFAULT_FENCE: &str = "```";

/// Split a markdown document on heading and paragraph boundaries
pub fn split_markdown(text: &str, target: usize) -> Vec<Chunk> {
    let target = target.max(1);
    debug!(len = text.len(), target, "split_markdown: called");

    let mut splitter = MarkdownSplitter::new(text, target);
    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        splitter.handle(event, range);
    }
    let chunks = splitter.finish();

    debug!(chunk_count = chunks.len(), "split_markdown: done");
    chunks
}

struct MarkdownSplitter<'a> {
    source: &'a str,
    target: usize,
    chunks: Vec<Chunk>,
    buffer: String,
    context: ChunkContext,
    has_code: bool,
    /// Source span of inline content not yet copied into the buffer
    inline: Option<Range<usize>>,
    /// End of the last inline event seen
    inline_end: usize,
    /// Fence marker of the code block being copied
    fence: Option<String>,
}

impl<'a> MarkdownSplitter<'a> {
    fn new(source: &'a str, target: usize) -> Self {
        Self {
            source,
            target,
            chunks: Vec::new(),
            buffer: String::new(),
            context: ChunkContext::Body,
            has_code: false,
            inline: None,
            inline_end: 0,
            fence: None,
        }
    }

    fn handle(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.fence.is_some() {
            match event {
                Event::Text(code) => self.buffer.push_str(&code),
                Event::End(TagEnd::CodeBlock) => self.close_fence(),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) if is_inline_tag(&tag) => self.extend_inline(range.start..range.start),
            Event::End(tag) if is_inline_tag_end(&tag) => self.extend_inline(self.inline_end..range.end),
            Event::SoftBreak | Event::HardBreak => {
                self.flush_inline();
                self.buffer.push('\n');
                self.inline_end = range.end;
            }
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_inline();
                self.flush_chunk();
                let level = level as u8;
                debug!(level, "split_markdown: heading starts chunk");
                self.context = ChunkContext::Section { level };
                self.buffer.push_str(&"#".repeat(level as usize));
                self.buffer.push(' ');
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Paragraph) => {
                self.flush_inline();
                self.buffer.push('\n');
            }
            Event::Start(Tag::Paragraph) => {
                self.flush_inline();
                self.split_at_target();
            }
            Event::Start(Tag::Item) => {
                // tight list items carry no paragraph events
                self.flush_inline();
                self.split_at_target();
                self.line_break();
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush_inline();
                self.split_at_target();
                self.open_fence(kind, range);
            }
            Event::Html(html) => {
                self.flush_inline();
                self.buffer.push_str(&html);
            }
            Event::Rule => {
                self.flush_inline();
                self.line_break();
                self.buffer.push_str(self.source[range].trim());
                self.buffer.push('\n');
            }
            Event::Start(_) | Event::End(_) => {
                // lists, block quotes, html blocks
                self.flush_inline();
                self.line_break();
            }
            _ => self.extend_inline(range),
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush_inline();
        self.flush_chunk();
        self.chunks
    }

    /// Grow the pending inline span; events arrive in source order
    fn extend_inline(&mut self, range: Range<usize>) {
        let span = match self.inline.take() {
            Some(span) => span.start..span.end.max(range.end),
            None => range,
        };
        self.inline_end = span.end;
        self.inline = Some(span);
    }

    fn flush_inline(&mut self) {
        if let Some(span) = self.inline.take() {
            self.buffer.push_str(&self.source[span]);
        }
    }

    fn flush_chunk(&mut self) {
        let text = self.buffer.trim();
        if !text.is_empty() {
            self.chunks.push(Chunk::new(text, self.context, self.has_code));
        }
        self.buffer.clear();
        self.context = ChunkContext::Body;
        self.has_code = false;
    }

    fn split_at_target(&mut self) {
        if word_count(&self.buffer) >= self.target {
            debug!("split_markdown: target reached at block boundary");
            self.flush_chunk();
        }
    }

    fn line_break(&mut self) {
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
    }

    fn open_fence(&mut self, kind: CodeBlockKind<'_>, range: Range<usize>) {
        let (marker, info) = match kind {
            CodeBlockKind::Fenced(info) => (fence_marker(&self.source[range]), info.to_string()),
            CodeBlockKind::Indented => (DEFAULT_FENCE.to_string(), String::new()),
        };
        debug!(%marker, %info, "split_markdown: code block");

        self.line_break();
        self.buffer.push_str(&marker);
        self.buffer.push_str(&info);
        self.buffer.push('\n');
        self.has_code = true;
        self.fence = Some(marker);
    }

    fn close_fence(&mut self) {
        if let Some(marker) = self.fence.take() {
            self.line_break();
            self.buffer.push_str(&marker);
            self.buffer.push('\n');
        }
    }
}

fn is_inline_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn is_inline_tag_end(tag: &TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
    )
}

/// Opening fence characters of a fenced code block's source
fn fence_marker(block: &str) -> String {
    let marker: String = block
        .trim_start()
        .chars()
        .take_while(|c| *c == '`' || *c == '~')
        .collect();
    if marker.len() < 3 { DEFAULT_FENCE.to_string() } else { marker }
}
