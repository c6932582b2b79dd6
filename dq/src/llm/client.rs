//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent (fresh context)
///
/// Every batch of a document is rewritten in its own request; nothing is
/// carried between calls except the system prompt the caller sends again.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted results in order. In echo mode, once the script is
    /// exhausted it answers each request with its user text wrapped in `<>`.
    pub struct MockLlmClient {
        scripted: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        echo: bool,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::with_results(responses.into_iter().map(Ok).collect())
        }

        pub fn with_results(results: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                scripted: Mutex::new(results.into()),
                echo: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn echo() -> Self {
            Self {
                echo: true,
                ..Self::with_results(vec![])
            }
        }

        /// Echo once the scripted results run out
        pub fn then_echo(mut self) -> Self {
            self.echo = true;
            self
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            let user_text = request
                .messages
                .last()
                .map(|m| m.content.trim().to_string())
                .unwrap_or_default();
            self.requests.lock().unwrap().push(request);

            if let Some(result) = self.scripted.lock().unwrap().pop_front() {
                return result;
            }
            if self.echo {
                return Ok(CompletionResponse::text(format!("<{}>", user_text)));
            }
            debug!("MockLlmClient::complete: no more mock responses");
            Err(LlmError::InvalidResponse("No more mock responses".to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::Message;

        fn request(text: &str) -> CompletionRequest {
            CompletionRequest {
                model: "gpt-3.5-turbo".to_string(),
                system_prompt: "Test".to_string(),
                messages: vec![Message::user(text)],
                max_tokens: 1000,
                temperature: 0.0,
            }
        }

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec![
                CompletionResponse::text("Response 1"),
                CompletionResponse::text("Response 2"),
            ]);

            let resp1 = client.complete(request("a")).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(request("b")).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            assert!(client.complete(request("a")).await.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_echo() {
            let client = MockLlmClient::echo();
            let resp = client.complete(request("  hello\n")).await.unwrap();
            assert_eq!(resp.content.as_deref(), Some("<hello>"));
            assert_eq!(client.requests()[0].messages[0].content, "  hello\n");
        }
    }
}
