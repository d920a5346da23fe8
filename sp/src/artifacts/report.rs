//! Structured error dump written as an `error` artifact

use serde::Serialize;

/// Full diagnostic for one failed pipeline stage
///
/// This is the only place the complete failure detail is kept; the state
/// machine only ever sees a user-safe summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Pipeline stage that failed (prompt, llm, extraction, validation, storage, pipeline)
    pub stage: String,
    /// Owning generation request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Transport attempt or regeneration round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Diagnostic message
    pub message: String,
    /// Whether the failure was classified as retryable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// HTTP status, when the failure came from the endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Length of the raw response text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_length: Option<usize>,
    /// Every validation violation found
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

impl ErrorReport {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            request_id: None,
            attempt: None,
            message: message.into(),
            retryable: None,
            http_status: None,
            raw_length: None,
            violations: Vec::new(),
        }
    }

    pub fn request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    pub fn raw_length(mut self, len: usize) -> Self {
        self.raw_length = Some(len);
        self
    }

    pub fn violations<I, T>(mut self, violations: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.violations = violations.into_iter().map(|v| v.to_string()).collect();
        self
    }
}
