//! LLM Client module
//!
//! Provides the completion client used for the rewrite call.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, CompletionResponse, Message, Model, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create the completion client described by the config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OpenAIClient::from_config(config)?))
}
