//! OpenAI-compatible chat completions client
//!
//! Performs a single POST per call; classification of the outcome is left to
//! [`LlmError::is_retryable`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ChatRequest, CompletionResponse, LlmClient, LlmError};
use crate::config::LlmConfig;

/// Error bodies are truncated to this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

/// OpenAI-compatible API client
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenAIClient {
    /// Create a client from configuration, reading the key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        Self::new(api_key, &config.base_url, config.timeout())
    }

    /// Create a client with an explicit key
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Pull `choices[0].message.content` out of a success body
    fn parse_body(body: &str) -> Result<String, LlmError> {
        let envelope: ChatCompletionEnvelope = serde_json::from_str(body)
            .map_err(|e| LlmError::InvalidResponse(format!("malformed completion envelope: {e}")))?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("completion has no message content".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, max_tokens = request.max_tokens, "complete: called");

        let response = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    debug!("complete: request timed out");
                }
                LlmError::Network(e)
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            debug!("complete: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimited { retry_after });
        }

        let body = response.text().await?;

        if !(200..300).contains(&status) {
            debug!(%status, "complete: API error");
            return Err(LlmError::ApiError {
                status,
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let text = Self::parse_body(&body)?;
        debug!(%status, text_len = text.len(), "complete: success");
        Ok(CompletionResponse {
            text,
            http_status: status,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionEnvelope {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_extracts_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"overview\":\"x\"}"},"finish_reason":"stop"}],"usage":{"prompt_tokens":1,"completion_tokens":2}}"#;
        assert_eq!(OpenAIClient::parse_body(body).unwrap(), r#"{"overview":"x"}"#);
    }

    #[test]
    fn test_parse_body_rejects_empty_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(OpenAIClient::parse_body(body), Err(LlmError::InvalidResponse(_))));

        let body = r#"{"choices":[]}"#;
        assert!(matches!(OpenAIClient::parse_body(body), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_body_rejects_non_json() {
        let err = OpenAIClient::parse_body("<html>gateway</html>").unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenAIClient::new("key", "https://llm.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://llm.example.com/v1/chat/completions");
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LlmConfig {
            api_key_env: "STUDYPLAN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = OpenAIClient::from_config(&config).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
        assert!(err.is_auth_failure());
    }
}
