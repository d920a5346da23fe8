//! Pipeline error taxonomy

use thiserror::Error;

use crate::extract::ExtractionError;
use crate::llm::LlmError;
use crate::prompts::PromptError;
use crate::state::StateError;
use crate::storage::PlanStoreError;
use crate::validation::PlanViolation;

/// Any unrecovered failure of one generation request
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("generated plan has {} violation(s): {}", .0.len(), summarize(.0))]
    InvalidPlan(Vec<PlanViolation>),

    #[error(transparent)]
    Storage(#[from] PlanStoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("generation task stopped unexpectedly: {0}")]
    Aborted(String),
}

fn summarize(violations: &[PlanViolation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

impl GenerationError {
    /// Pipeline stage the error came from, as recorded in error artifacts
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Prompt(_) => "prompt",
            Self::Llm(_) => "llm",
            Self::Extraction(_) => "extraction",
            Self::InvalidPlan(_) => "validation",
            Self::Storage(_) => "storage",
            Self::State(_) => "state",
            Self::Aborted(_) => "pipeline",
        }
    }

    /// Extraction and validation failures may be cured by asking again
    pub fn is_regenerable(&self) -> bool {
        matches!(self, Self::Extraction(_) | Self::InvalidPlan(_))
    }

    /// Summary safe to show the end user
    ///
    /// Never includes raw model output or transport internals; those live in
    /// the debug artifacts.
    pub fn user_message(&self) -> String {
        match self {
            Self::Prompt(PromptError::InvalidSurvey(errors)) => {
                let details = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
                format!("Please check your survey answers: {details}")
            }
            Self::Prompt(PromptError::Template(_)) => "The study plan request could not be prepared.".to_string(),
            Self::Llm(e) if e.is_auth_failure() => {
                "The study plan service is not configured correctly. Please contact support.".to_string()
            }
            Self::Llm(LlmError::RetriesExhausted { .. }) | Self::Llm(LlmError::Timeout(_)) => {
                "The study plan service is busy or unreachable. Please try again later.".to_string()
            }
            Self::Llm(_) => "The study plan service could not process the request.".to_string(),
            Self::Extraction(_) => "The generated plan could not be read. Please try again.".to_string(),
            Self::InvalidPlan(violations) => format!(
                "The generated plan was inconsistent ({} problem(s) found). Please try again.",
                violations.len()
            ),
            Self::Storage(_) => "The study plan could not be saved. Please try again.".to_string(),
            Self::State(_) => "A generation is already in progress.".to_string(),
            Self::Aborted(_) => "Study plan generation stopped unexpectedly. Please try again.".to_string(),
        }
    }
}
