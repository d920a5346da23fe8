//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("LLM API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Check if this error is retryable
    ///
    /// Timeouts, transport failures, 408/429 and 5xx are retryable. Every
    /// other 4xx, a malformed envelope, a missing key and an exhausted retry
    /// budget are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500 || *status == 408,
            LlmError::Network(e) => !(e.is_decode() || e.is_builder()),
            LlmError::Connection(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::MissingApiKey(_) => false,
            LlmError::RetriesExhausted { .. } => false,
        }
    }

    /// Get the server-requested delay if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::RateLimited { .. } => Some(429),
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            LlmError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Credentials missing or rejected by the endpoint
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, LlmError::MissingApiKey(_)) || matches!(self.status(), Some(401 | 403))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LlmError {
        LlmError::ApiError {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(LlmError::RateLimited { retry_after: None }.is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(502).is_retryable());
        assert!(api(503).is_retryable());
        assert!(api(408).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(LlmError::Connection("reset by peer".to_string()).is_retryable());

        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
        assert!(!LlmError::MissingApiKey("KEY".to_string()).is_retryable());
        assert!(
            !LlmError::RetriesExhausted {
                attempts: 3,
                last: Box::new(api(503)),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_retry_after() {
        let err = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(api(500).retry_after(), None);
    }

    #[test]
    fn test_status_and_auth() {
        assert_eq!(api(401).status(), Some(401));
        assert!(api(401).is_auth_failure());
        assert!(api(403).is_auth_failure());
        assert!(!api(500).is_auth_failure());
        assert!(LlmError::MissingApiKey("KEY".to_string()).is_auth_failure());

        let exhausted = LlmError::RetriesExhausted {
            attempts: 2,
            last: Box::new(api(502)),
        };
        assert_eq!(exhausted.status(), Some(502));
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).status(), None);
    }
}
