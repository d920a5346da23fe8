//! GenerationRequest domain type
//!
//! Tracks one submission from `generating` to a terminal state. The request
//! doubles as the persisted snapshot that survives a client reload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::SurveyAnswers;

/// Generation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// Pipeline running
    Generating,
    /// Plan persisted
    Success,
    /// Unrecovered failure
    Error,
}

impl GenerationStatus {
    /// Terminal states only change through an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Generating => write!(f, "generating"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One submission attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Unique identifier
    pub id: String,

    /// The submitted survey
    pub survey_answers: SurveyAnswers,

    /// When generation started
    pub start_time: DateTime<Utc>,

    /// Current status
    pub status: GenerationStatus,

    /// Client-visible progress estimate (0-100)
    pub progress: u8,

    /// User-safe failure summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Persisted plan ID once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

impl GenerationRequest {
    /// Create a request in the `generating` state
    pub fn begin(survey_answers: SurveyAnswers, start_time: DateTime<Utc>) -> Self {
        let id = Uuid::now_v7().to_string();
        debug!(%id, "GenerationRequest::begin: called");
        Self {
            id,
            survey_answers,
            start_time,
            status: GenerationStatus::Generating,
            progress: 0,
            error_message: None,
            plan_id: None,
        }
    }
}

/// Status surface consumed by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: GenerationStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&GenerationRequest> for StatusView {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            status: request.status,
            progress: request.progress,
            plan_id: request.plan_id.clone(),
            error: request.error_message.clone(),
        }
    }
}
