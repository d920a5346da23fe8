//! StudyPlan domain types
//!
//! Field names serialize in camelCase, matching both the JSON the model is
//! asked to produce and the persisted plan record.

use serde::{Deserialize, Serialize};

/// A validated multi-phase study plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub overview: String,
    pub phases: Vec<Phase>,
    pub daily_plans: Vec<DailyPlan>,
}

impl StudyPlan {
    /// Look up a phase by ID
    pub fn phase(&self, id: u32) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// Number of planned days
    pub fn total_days(&self) -> usize {
        self.daily_plans.len()
    }

    /// Total task minutes across the whole plan
    pub fn total_minutes(&self) -> u64 {
        self.daily_plans
            .iter()
            .flat_map(|d| d.tasks.iter())
            .map(|t| u64::from(t.duration_minutes))
            .sum()
    }
}

/// A contiguous day range with its own focus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub start_day: u32,
    pub end_day: u32,
    pub focus_areas: Vec<String>,
    pub learning_goals: Vec<String>,
    pub recommended_resources: Vec<String>,
}

impl Phase {
    /// Whether `day` falls inside this phase (inclusive)
    pub fn contains(&self, day: u32) -> bool {
        (self.start_day..=self.end_day).contains(&day)
    }
}

/// Tasks assigned to one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub day: u32,
    pub phase_id: u32,
    pub title: String,
    pub subjects: Vec<String>,
    pub tasks: Vec<Task>,
    pub review_tips: String,
}

/// One unit of study work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub resources: Vec<String>,
}
