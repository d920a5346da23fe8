//! GenerationStateMachine
//!
//! ```text
//! idle --start--> generating --complete--> success
//!                     |
//!                     +--------fail------> error
//! success | error --reset--> idle
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::StateError;
use crate::domain::{GenerationRequest, GenerationStatus, StatusView, SurveyAnswers};

/// Highest progress reported before a terminal transition
pub const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

/// Message stored when a restored request outlived its budget
pub const STALE_MESSAGE: &str = "Generation timed out. Please try again.";

/// Status and progress of at most one generation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStateMachine {
    request: Option<GenerationRequest>,
}

impl GenerationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot
    pub fn restore(snapshot: Option<GenerationRequest>) -> Self {
        // An idle snapshot carries nothing worth keeping
        let request = snapshot.filter(|r| r.status != GenerationStatus::Idle);
        Self { request }
    }

    pub fn status(&self) -> GenerationStatus {
        self.request.as_ref().map(|r| r.status).unwrap_or_default()
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        self.request.as_ref()
    }

    /// The client-visible status surface
    pub fn view(&self) -> StatusView {
        self.request.as_ref().map(StatusView::from).unwrap_or_default()
    }

    pub fn start_generation(&mut self, survey: SurveyAnswers) -> Result<&GenerationRequest, StateError> {
        self.start_generation_at(survey, Utc::now())
    }

    /// Enter `generating` with progress 0; legal only from `idle`
    pub fn start_generation_at(
        &mut self,
        survey: SurveyAnswers,
        start_time: DateTime<Utc>,
    ) -> Result<&GenerationRequest, StateError> {
        debug!(status = %self.status(), "start_generation: called");
        if self.status() != GenerationStatus::Idle {
            return Err(StateError::InvalidTransition {
                operation: "start",
                status: self.status(),
            });
        }

        let request = self.request.insert(GenerationRequest::begin(survey, start_time));
        info!(request_id = %request.id, "Generation started");
        Ok(request)
    }

    /// Apply a progress estimate
    ///
    /// Clamped to `[0, 99]` and never moves backwards. Returns false, leaving
    /// state untouched, unless the request is `generating`.
    pub fn update_progress(&mut self, progress: u32) -> bool {
        let Some(request) = self.request.as_mut() else {
            debug!("update_progress: idle, ignoring");
            return false;
        };
        if request.status != GenerationStatus::Generating {
            debug!(status = %request.status, "update_progress: not generating, ignoring");
            return false;
        }

        let clamped = progress.min(u32::from(MAX_IN_FLIGHT_PROGRESS)) as u8;
        request.progress = request.progress.max(clamped);
        true
    }

    /// `generating` to `success`
    pub fn complete(&mut self, plan_id: impl Into<String>) -> Result<(), StateError> {
        let request = self.generating_mut("complete")?;
        request.status = GenerationStatus::Success;
        request.progress = 100;
        request.plan_id = Some(plan_id.into());
        info!(request_id = %request.id, plan_id = ?request.plan_id, "Generation succeeded");
        Ok(())
    }

    /// `generating` to `error`; `message` must already be user-safe
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), StateError> {
        let request = self.generating_mut("fail")?;
        request.status = GenerationStatus::Error;
        request.error_message = Some(message.into());
        warn!(request_id = %request.id, error = ?request.error_message, "Generation failed");
        Ok(())
    }

    /// Back to `idle`, clearing every field
    pub fn reset(&mut self) {
        debug!(status = %self.status(), "reset: called");
        self.request = None;
    }

    /// Fail a `generating` request older than `budget`
    ///
    /// Used on restore: the process that was driving it is gone, so nothing
    /// else would ever move it to a terminal state.
    pub fn expire_if_stale(&mut self, budget: Duration, now: DateTime<Utc>) -> bool {
        let Some(request) = self.request.as_ref() else {
            return false;
        };
        if request.status != GenerationStatus::Generating {
            return false;
        }

        let age = (now - request.start_time).to_std().unwrap_or_default();
        if age <= budget {
            return false;
        }

        warn!(request_id = %request.id, age_secs = age.as_secs(), "Expiring stale generation");
        self.fail(STALE_MESSAGE).is_ok()
    }

    fn generating_mut(&mut self, operation: &'static str) -> Result<&mut GenerationRequest, StateError> {
        let status = self.status();
        match self.request.as_mut() {
            Some(request) if request.status == GenerationStatus::Generating => Ok(request),
            _ => Err(StateError::InvalidTransition { operation, status }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_survey;

    fn generating() -> GenerationStateMachine {
        let mut machine = GenerationStateMachine::new();
        machine.start_generation(sample_survey()).unwrap();
        machine
    }

    #[test]
    fn test_start_sets_generating_with_zero_progress() {
        let machine = generating();
        let request = machine.request().unwrap();
        assert_eq!(request.status, GenerationStatus::Generating);
        assert_eq!(request.progress, 0);
        assert_eq!(request.survey_answers, sample_survey());
    }

    #[test]
    fn test_progress_clamps_to_99() {
        let mut machine = generating();
        assert!(machine.update_progress(150));
        assert_eq!(machine.view().progress, 99);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut machine = generating();
        machine.update_progress(40);
        machine.update_progress(10);
        assert_eq!(machine.view().progress, 40);
    }

    #[test]
    fn test_complete_sets_success_and_100() {
        let mut machine = generating();
        machine.update_progress(50);
        machine.complete("plan-1").unwrap();

        let view = machine.view();
        assert_eq!(view.status, GenerationStatus::Success);
        assert_eq!(view.progress, 100);
        assert_eq!(view.plan_id.as_deref(), Some("plan-1"));
    }

    #[test]
    fn test_progress_after_complete_is_noop() {
        let mut machine = generating();
        machine.complete("plan-1").unwrap();
        let before = machine.clone();

        assert!(!machine.update_progress(10));
        assert_eq!(machine, before);
        assert_eq!(machine.view().progress, 100);
    }

    #[test]
    fn test_progress_when_idle_is_noop() {
        let mut machine = GenerationStateMachine::new();
        assert!(!machine.update_progress(10));
        assert_eq!(machine.view(), StatusView::default());
    }

    #[test]
    fn test_reset_after_error_clears_everything() {
        let mut machine = generating();
        machine.fail("The plan could not be generated.").unwrap();
        assert_eq!(machine.view().status, GenerationStatus::Error);
        assert_eq!(machine.view().error.as_deref(), Some("The plan could not be generated."));

        machine.reset();
        assert_eq!(machine.status(), GenerationStatus::Idle);
        assert!(machine.request().is_none());
        assert_eq!(machine.view(), StatusView::default());
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut machine = generating();
        machine.fail("boom").unwrap();

        assert!(matches!(
            machine.complete("plan"),
            Err(StateError::InvalidTransition {
                operation: "complete",
                status: GenerationStatus::Error
            })
        ));
        assert!(machine.fail("again").is_err());
        assert!(machine.start_generation(sample_survey()).is_err());
        assert_eq!(machine.view().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_complete_from_idle_is_illegal() {
        let mut machine = GenerationStateMachine::new();
        assert!(machine.complete("plan").is_err());
        assert!(machine.fail("boom").is_err());
    }

    #[test]
    fn test_expire_if_stale() {
        let mut machine = GenerationStateMachine::new();
        let start = Utc::now() - chrono::Duration::minutes(30);
        machine.start_generation_at(sample_survey(), start).unwrap();

        assert!(!machine.expire_if_stale(Duration::from_secs(3600), Utc::now()));
        assert_eq!(machine.status(), GenerationStatus::Generating);

        assert!(machine.expire_if_stale(Duration::from_secs(60), Utc::now()));
        assert_eq!(machine.status(), GenerationStatus::Error);
        assert_eq!(machine.view().error.as_deref(), Some(STALE_MESSAGE));
    }

    #[test]
    fn test_restore_drops_idle_snapshot() {
        let mut request = GenerationRequest::begin(sample_survey(), Utc::now());
        request.status = GenerationStatus::Idle;
        assert!(GenerationStateMachine::restore(Some(request)).request().is_none());
    }
}
