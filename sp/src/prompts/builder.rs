//! PromptBuilder - survey answers to prompt text
//!
//! Pure: no I/O, and identical input always renders an identical prompt.

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::embedded;
use crate::config::LlmConfig;
use crate::domain::{SurveyAnswers, SurveyError};

/// Errors from prompt construction
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("invalid survey answers: {}", summarize(.0))]
    InvalidSurvey(Vec<SurveyError>),

    #[error("template rendering failed: {0}")]
    Template(String),
}

fn summarize(errors: &[SurveyError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Fixed generation parameters sent with every prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for ModelParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A rendered prompt ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// System instruction
    pub system: String,
    /// Rendered user prompt
    pub text: String,
    /// Model parameters
    pub params: ModelParams,
}

impl Prompt {
    /// Full prompt as written to the debug artifact
    pub fn to_artifact(&self) -> String {
        format!(
            "# model: {} | temperature: {} | max_tokens: {}\n\n## system\n{}\n## user\n{}",
            self.params.model, self.params.temperature, self.params.max_tokens, self.system, self.text
        )
    }
}

#[derive(Debug, Serialize)]
struct SubjectLine<'a> {
    name: &'a str,
    level: String,
}

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    exam_level: &'a str,
    exam_status: String,
    subjects: Vec<SubjectLine<'a>>,
    excluded: Vec<&'a str>,
    weekly_hours: u32,
    daily_hours: u32,
    plan_days: u32,
    notes: &'a str,
}

impl<'a> PromptContext<'a> {
    fn from_survey(survey: &'a SurveyAnswers) -> Self {
        let subjects = survey
            .included_subjects()
            .map(|s| SubjectLine {
                name: s.name.trim(),
                level: s.level.map(|l| l.to_string()).unwrap_or_default(),
            })
            .collect();
        let excluded = survey
            .subjects
            .iter()
            .filter(|s| !s.included)
            .map(|s| s.name.trim())
            .collect();

        Self {
            exam_level: survey.exam_level.trim(),
            exam_status: survey.exam_status.to_string(),
            subjects,
            excluded,
            weekly_hours: survey.weekly_hours,
            daily_hours: survey.daily_hours,
            plan_days: survey.plan_days,
            notes: survey.notes.as_deref().map(str::trim).unwrap_or_default(),
        }
    }
}

/// Renders study plan prompts
pub struct PromptBuilder {
    hbs: Handlebars<'static>,
    params: ModelParams,
}

impl PromptBuilder {
    /// Create a builder sending prompts with the given model parameters
    pub fn new(params: ModelParams) -> Self {
        debug!(?params, "PromptBuilder::new: called");
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, params }
    }

    /// Validate the survey and render the prompt
    pub fn build(&self, survey: &SurveyAnswers) -> Result<Prompt, PromptError> {
        debug!(plan_days = survey.plan_days, "PromptBuilder::build: called");
        survey.validate().map_err(PromptError::InvalidSurvey)?;

        let context = PromptContext::from_survey(survey);
        let text = self
            .hbs
            .render_template(embedded::STUDY_PLAN, &context)
            .map_err(|e| PromptError::Template(e.to_string()))?;

        debug!(prompt_len = text.len(), "PromptBuilder::build: rendered");
        Ok(Prompt {
            system: embedded::SYSTEM.trim_end().to_string(),
            text,
            params: self.params.clone(),
        })
    }
}
