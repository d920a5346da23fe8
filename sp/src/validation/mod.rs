//! PlanValidator - extracted JSON to a checked [`StudyPlan`]
//!
//! Validation never stops at the first problem. The structural pass walks
//! every field and records each missing or mistyped value; the semantic pass
//! then checks phase ordering and day coverage across the whole plan.

mod error;
mod schema;
mod semantic;

pub use error::PlanViolation;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::StudyPlan;

/// Validate an extracted payload, returning every violation found
pub fn validate_plan(payload: &Value) -> Result<StudyPlan, Vec<PlanViolation>> {
    debug!("validate_plan: called");
    let mut violations = Vec::new();

    let parsed = schema::parse_plan(payload, &mut violations);
    if let Some(parsed) = &parsed {
        semantic::check(parsed, &mut violations);
    }

    match parsed {
        Some(parsed) if violations.is_empty() => {
            let plan = parsed.plan;
            info!(
                phases = plan.phases.len(),
                days = plan.daily_plans.len(),
                "Study plan passed validation"
            );
            Ok(plan)
        }
        _ => {
            warn!(count = violations.len(), "Study plan failed validation");
            Err(violations)
        }
    }
}
