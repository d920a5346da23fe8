//! StudyPlan - LLM-driven exam study plan generation
//!
//! Turns a candidate's survey answers into a validated, persisted multi-phase
//! study plan. The model's output is treated as untrusted text: the plan is
//! recovered from it, checked against every structural and cross-field rule,
//! and only then stored.
//!
//! # Modules
//!
//! - [`prompts`] - Survey answers to a deterministic prompt
//! - [`llm`] - Completion client with timeout, retry and backoff
//! - [`extract`] - Ordered fallback recovery of JSON from model text
//! - [`validation`] - Plan schema and invariant checks
//! - [`artifacts`] - Debug artifacts for every pipeline attempt
//! - [`state`] - Generation status machine, persistence and progress
//! - [`storage`] - Plan persistence adapter
//! - [`pipeline`] - End-to-end orchestration
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod domain;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod state;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use artifacts::{ArtifactKind, DebugArtifact, DebugArtifactStore};
pub use config::Config;
pub use domain::{
    DailyPlan, GenerationRequest, GenerationStatus, Phase, StatusView, StudyPlan, SurveyAnswers, Task,
};
pub use extract::{ExtractionError, ExtractionStrategy, extract};
pub use llm::{LlmClient, LlmError, OpenAIClient, RetryPolicy, RetryingClient};
pub use pipeline::{GenerationError, Pipeline, PipelineSettings};
pub use prompts::{Prompt, PromptBuilder};
pub use state::{GenerationStateMachine, StatusHandle};
pub use storage::{PlanStore, SqlitePlanStore};
pub use validation::{PlanViolation, validate_plan};
