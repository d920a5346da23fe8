//! LLM client module
//!
//! [`LlmClient`] is a single completion attempt against the endpoint.
//! [`RetryingClient`] layers the timeout, retry and backoff policy on top and
//! copies every attempt to the debug artifact store.

mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use client::LlmClient;
pub use client::mock::{MockLlmClient, MockReply};
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use retry::{RetryDecision, RetryPolicy, RetryingClient};
pub use types::{ChatMessage, ChatRequest, CompletionResponse, RawCompletion, Role};
