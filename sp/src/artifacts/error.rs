//! Artifact error types

use thiserror::Error;

/// Errors from debug artifact operations
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid artifact name: {0:?}")]
    InvalidName(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Artifact already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
