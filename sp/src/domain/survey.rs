//! SurveyAnswers domain type
//!
//! Produced by the client form and never mutated after submission.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Upper bound on plan length in days
pub const MAX_PLAN_DAYS: u32 = 365;

/// Whether the candidate has sat this exam before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    FirstAttempt,
    Retake,
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstAttempt => write!(f, "first attempt"),
            Self::Retake => write!(f, "retake"),
        }
    }
}

/// Self-assessed proficiency in a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// One subject row of the survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnswer {
    /// Subject name as shown on the form
    pub name: String,

    /// Whether the subject is part of the candidate's exam
    pub included: bool,

    /// Self-assessed level, required when `included` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SkillLevel>,
}

impl SubjectAnswer {
    /// Create an included subject with a level
    pub fn included(name: impl Into<String>, level: SkillLevel) -> Self {
        Self {
            name: name.into(),
            included: true,
            level: Some(level),
        }
    }

    /// Create an excluded subject
    pub fn excluded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            included: false,
            level: None,
        }
    }
}

/// Structural problems in a survey submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurveyError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("at least one subject must be included")]
    NoSubjectsIncluded,

    #[error("subject #{0} has an empty name")]
    EmptySubjectName(usize),

    #[error("subject {0:?} is listed more than once")]
    DuplicateSubject(String),

    #[error("subject {0:?} is included but has no self-assessed level")]
    MissingLevel(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("daily hours ({daily}) exceed weekly hours ({weekly})")]
    DailyExceedsWeekly { daily: u32, weekly: u32 },
}

/// Survey answers submitted by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    /// Exam level being prepared for (e.g. "advanced")
    pub exam_level: String,

    /// First attempt or retake
    pub exam_status: ExamStatus,

    /// Subject flags and self-assessed levels, in form order
    pub subjects: Vec<SubjectAnswer>,

    /// Hours available per week
    pub weekly_hours: u32,

    /// Hours available per study day
    pub daily_hours: u32,

    /// Length of the plan in days
    pub plan_days: u32,

    /// Free-text notes from the candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SurveyAnswers {
    /// Subjects the candidate is actually sitting
    pub fn included_subjects(&self) -> impl Iterator<Item = &SubjectAnswer> {
        self.subjects.iter().filter(|s| s.included)
    }

    /// Check structural validity, returning every problem found
    pub fn validate(&self) -> Result<(), Vec<SurveyError>> {
        debug!(subject_count = self.subjects.len(), "SurveyAnswers::validate: called");
        let mut errors = Vec::new();

        if self.exam_level.trim().is_empty() {
            errors.push(SurveyError::MissingField("exam level"));
        }

        let mut seen = HashSet::new();
        for (idx, subject) in self.subjects.iter().enumerate() {
            let name = subject.name.trim();
            if name.is_empty() {
                errors.push(SurveyError::EmptySubjectName(idx + 1));
                continue;
            }
            if !seen.insert(name.to_lowercase()) {
                errors.push(SurveyError::DuplicateSubject(name.to_string()));
            }
            if subject.included && subject.level.is_none() {
                errors.push(SurveyError::MissingLevel(name.to_string()));
            }
        }

        if self.included_subjects().next().is_none() {
            errors.push(SurveyError::NoSubjectsIncluded);
        }

        check_range(&mut errors, "weekly hours", self.weekly_hours, 1, 168);
        check_range(&mut errors, "daily hours", self.daily_hours, 1, 24);
        check_range(&mut errors, "plan days", self.plan_days, 1, MAX_PLAN_DAYS);

        if self.daily_hours > self.weekly_hours {
            errors.push(SurveyError::DailyExceedsWeekly {
                daily: self.daily_hours,
                weekly: self.weekly_hours,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            debug!(error_count = errors.len(), "SurveyAnswers::validate: invalid");
            Err(errors)
        }
    }
}

fn check_range(errors: &mut Vec<SurveyError>, field: &'static str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(SurveyError::OutOfRange { field, value, min, max });
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn sample_survey() -> SurveyAnswers {
        SurveyAnswers {
            exam_level: "advanced".to_string(),
            exam_status: ExamStatus::FirstAttempt,
            subjects: vec![
                SubjectAnswer::included("Mathematics", SkillLevel::Intermediate),
                SubjectAnswer::included("English", SkillLevel::Beginner),
                SubjectAnswer::excluded("Chemistry"),
            ],
            weekly_hours: 20,
            daily_hours: 4,
            plan_days: 30,
            notes: None,
        }
    }
}
