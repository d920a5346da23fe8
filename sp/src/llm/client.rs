//! LlmClient trait definition

use async_trait::async_trait;

use super::{ChatRequest, CompletionResponse, LlmError};

/// One completion attempt against the endpoint
///
/// Implementations perform exactly one request and classify its failure;
/// retrying is [`super::RetryingClient`]'s job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, LlmError>;
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// Scripted outcome of one mock attempt
    #[derive(Debug, Clone)]
    pub enum MockReply {
        /// 200 with this content
        Text(String),
        /// Non-success HTTP status
        Status(u16),
        /// 429 with optional Retry-After
        RateLimited(Option<Duration>),
        /// Transport failure
        ConnectionReset,
        /// Sleep, then reply
        Delayed(Duration, Box<MockReply>),
    }

    impl MockReply {
        pub fn text(content: impl Into<String>) -> Self {
            Self::Text(content.into())
        }
    }

    /// Scripted LLM client for tests
    pub struct MockLlmClient {
        replies: Mutex<VecDeque<MockReply>>,
        requests: Mutex<Vec<ChatRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(replies: Vec<MockReply>) -> Self {
            debug!(reply_count = %replies.len(), "MockLlmClient::new: called");
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests received so far
        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
        }

        fn resolve(reply: MockReply) -> Result<CompletionResponse, LlmError> {
            match reply {
                MockReply::Text(text) => Ok(CompletionResponse { text, http_status: 200 }),
                MockReply::Status(status) => Err(LlmError::ApiError {
                    status,
                    message: format!("mock status {status}"),
                }),
                MockReply::RateLimited(retry_after) => Err(LlmError::RateLimited { retry_after }),
                MockReply::ConnectionReset => Err(LlmError::Connection("connection reset by peer".to_string())),
                MockReply::Delayed(_, inner) => Self::resolve(*inner),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: called");
            self.requests.lock().unwrap_or_else(|p| p.into_inner()).push(request.clone());

            let reply = self.replies.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
            let Some(reply) = reply else {
                debug!("MockLlmClient::complete: no more mock responses");
                return Err(LlmError::InvalidResponse("No more mock responses".to_string()));
            };

            if let MockReply::Delayed(delay, _) = &reply {
                tokio::time::sleep(*delay).await;
            }
            Self::resolve(reply)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn request() -> ChatRequest {
            ChatRequest {
                model: "mock".to_string(),
                messages: vec![],
                temperature: 0.0,
                max_tokens: 10,
            }
        }

        #[tokio::test]
        async fn test_mock_client_replays_script() {
            let client = MockLlmClient::new(vec![MockReply::text("first"), MockReply::Status(503)]);

            let resp = client.complete(&request()).await.unwrap();
            assert_eq!(resp.text, "first");

            let err = client.complete(&request()).await.unwrap_err();
            assert!(matches!(err, LlmError::ApiError { status: 503, .. }));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.complete(&request()).await;
            assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
        }
    }
}
