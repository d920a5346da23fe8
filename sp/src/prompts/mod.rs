//! Prompt construction
//!
//! Turns validated survey answers into a deterministic prompt plus the fixed
//! model parameters it is sent with.

mod builder;
mod embedded;

pub use builder::{ModelParams, Prompt, PromptBuilder, PromptError};
pub use embedded::{STUDY_PLAN, SYSTEM};
