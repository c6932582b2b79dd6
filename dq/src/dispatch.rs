//! Batch dispatch and the rewrite call
//!
//! [`Rewriter`] turns one batch of text into its rewritten form with a single
//! completion request. [`Dispatcher`] drives the batcher over a document's
//! chunks and concatenates the rewritten batches in order.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::batcher::{Batch, Batcher};
use crate::chunker::{Chunk, word_count};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, Model, StopReason};
use crate::source::Document;

/// Sends text to the completion endpoint under a fixed system instruction
#[derive(Clone)]
pub struct Rewriter {
    llm: Arc<dyn LlmClient>,
    system_instruction: String,
    model: Model,
    max_tokens: u32,
    temperature: f32,
    debug: bool,
}

impl Rewriter {
    pub fn new(llm: Arc<dyn LlmClient>, system_instruction: impl Into<String>, model: Model) -> Self {
        Self {
            llm,
            system_instruction: system_instruction.into(),
            model,
            max_tokens: 4096,
            temperature: 0.0,
            debug: false,
        }
    }

    /// Bind a client to the run's rewrite and endpoint settings
    pub fn from_config(llm: Arc<dyn LlmClient>, config: &Config) -> Self {
        Self::new(llm, config.rewrite.system_instruction.clone(), config.rewrite.model)
            .with_max_tokens(config.llm.max_tokens)
            .with_temperature(config.llm.temperature)
            .with_debug(config.rewrite.debug)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Log every prompt and response
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Rewrite one batch of text
    ///
    /// A response without content yields an empty string.
    pub async fn rewrite(&self, text: &str) -> Result<String, LlmError> {
        debug!(model = %self.model, words = word_count(text), "Rewriter::rewrite: called");
        let request = CompletionRequest {
            model: self.model.as_str().to_string(),
            system_prompt: self.system_instruction.clone(),
            messages: vec![Message::user(text)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.llm.complete(request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            "Rewriter::rewrite: response received"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!(max_tokens = self.max_tokens, "Rewrite was truncated at the token limit");
        }

        let output = match response.content {
            Some(content) => content,
            None => {
                warn!("Rewrite returned no content");
                String::new()
            }
        };

        if self.debug {
            info!("Rewrite prompt:\n{}", text);
            info!("Rewrite output:\n{}", output);
        }
        Ok(output)
    }
}

/// Per-document statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub id: String,
    pub chunks: usize,
    pub batches: usize,
    pub words_in: usize,
    pub words_out: usize,
}

/// Batches a document's chunks and rewrites each batch in order
#[derive(Clone)]
pub struct Dispatcher {
    rewriter: Rewriter,
    target: usize,
}

impl Dispatcher {
    pub fn new(rewriter: Rewriter, target: usize) -> Self {
        Self { rewriter, target }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Rewrite a chunked document, one call per batch
    ///
    /// Each batch's result is followed by a newline. The first failed call
    /// aborts the document and discards what was already rewritten.
    pub async fn rewrite_document(&self, document: &Document, chunks: &[Chunk]) -> Result<(String, DocumentReport)> {
        debug!(id = %document.id(), chunk_count = chunks.len(), target = self.target, "rewrite_document: called");
        let mut report = DocumentReport {
            id: document.id().to_string(),
            chunks: chunks.len(),
            ..DocumentReport::default()
        };
        let mut output = String::new();
        let mut batcher = Batcher::new(self.target);

        for chunk in chunks {
            if let Some(batch) = batcher.push(chunk) {
                self.send(document, batch, &mut output, &mut report).await?;
            }
        }
        if let Some(batch) = batcher.finish() {
            self.send(document, batch, &mut output, &mut report).await?;
        }

        report.words_out = word_count(&output);
        Ok((output, report))
    }

    async fn send(
        &self,
        document: &Document,
        batch: Batch,
        output: &mut String,
        report: &mut DocumentReport,
    ) -> Result<()> {
        info!(
            document = %document.id(),
            batch = batch.index,
            words = batch.words,
            "Processing batched chunks"
        );
        if batch.is_oversized(self.target) {
            warn!(words = batch.words, target = self.target, "Batch exceeds target word count");
        }

        let response = self.rewriter.rewrite(&batch.text).await.map_err(|source| Error::RewriteCall {
            document: document.id().to_string(),
            batch: batch.index,
            source,
        })?;

        output.push_str(&response);
        output.push('\n');
        report.batches += 1;
        report.words_in += batch.words;
        Ok(())
    }
}
