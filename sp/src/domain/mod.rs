//! Domain types for study plan generation
//!
//! - [`SurveyAnswers`]: immutable client input
//! - [`StudyPlan`]: validated LLM output
//! - [`GenerationRequest`]: one submission attempt, owned by the state machine

mod plan;
mod request;
mod survey;

pub use plan::{DailyPlan, Phase, StudyPlan, Task};
pub use request::{GenerationRequest, GenerationStatus, StatusView};
pub use survey::{ExamStatus, MAX_PLAN_DAYS, SkillLevel, SubjectAnswer, SurveyAnswers, SurveyError};

#[cfg(test)]
pub(crate) use survey::fixtures;
