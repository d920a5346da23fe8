//! Status tracker messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{GenerationRequest, GenerationStatus, StatusView, SurveyAnswers};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot {operation} while {status}")]
    InvalidTransition {
        operation: &'static str,
        status: GenerationStatus,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StatusTracker actor
#[derive(Debug)]
pub enum StatusCommand {
    Start {
        survey: SurveyAnswers,
        reply: oneshot::Sender<StateResponse<GenerationRequest>>,
    },
    UpdateProgress {
        progress: u32,
        reply: oneshot::Sender<GenerationStatus>,
    },
    Complete {
        plan_id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    Fail {
        message: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    View {
        reply: oneshot::Sender<StatusView>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<GenerationRequest>>,
    },
}
