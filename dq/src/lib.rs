//! docsqueeze - document reduction through a chat-completion model
//!
//! Long documents are split into word-bounded chunks, the chunks are packed
//! into batches that fit a target word count, and each batch is rewritten by
//! the model under one fixed system instruction. The rewritten batches are
//! concatenated in order and appended to an output file.
//!
//! # Modules
//!
//! - [`chunker`] - plain and markdown-aware chunking
//! - [`batcher`] - packing chunks into rewrite-sized batches
//! - [`dispatch`] - the rewrite call and per-document dispatch
//! - [`llm`] - completion client trait and OpenAI implementation
//! - [`source`] - local file and GitHub document sources
//! - [`sink`] - append-only output
//! - [`pipeline`] - source to sink orchestration
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod batcher;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use batcher::{Batch, Batcher, plan_batches};
pub use chunker::{Chunk, ChunkContext, ChunkMode, chunk, word_count};
pub use config::Config;
pub use dispatch::{Dispatcher, DocumentReport, Rewriter};
pub use error::{Error, Result};
pub use llm::{LlmClient, LlmError, Model};
pub use pipeline::{DocumentFailure, DocumentPlan, Pipeline, RunSummary, plan};
pub use sink::{FileSink, OutputSink};
pub use source::{Document, DocumentSource, GithubSource, LocalFileSource, SourceError};
