//! Plan violations

use thiserror::Error;

/// One reason an extracted payload is not an acceptable study plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanViolation {
    #[error("{path}: missing required field")]
    MissingField { path: String },

    #[error("{path}: expected {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("{path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("plan has no phases")]
    NoPhases,

    #[error("plan has no daily plans")]
    NoDailyPlans,

    #[error("phase id {id} is used more than once")]
    DuplicatePhaseId { id: u32 },

    #[error("phase {id} starts on day {start_day} but ends on day {end_day}")]
    InvertedPhase { id: u32, start_day: u32, end_day: u32 },

    #[error("phase {second} (from day {second_start}) overlaps phase {first} (until day {first_end})")]
    PhaseOverlap {
        first: u32,
        first_end: u32,
        second: u32,
        second_start: u32,
    },

    #[error("days {from}..={to} fall between phase {before} and phase {after}")]
    PhaseGap { before: u32, after: u32, from: u32, to: u32 },

    #[error("day {day} references unknown phase {phase_id}")]
    UnknownPhase { day: u32, phase_id: u32 },

    #[error("day {day} lies outside phase {phase_id} (days {start_day}..={end_day})")]
    DayOutsidePhase {
        day: u32,
        phase_id: u32,
        start_day: u32,
        end_day: u32,
    },

    #[error("day {day} is planned more than once")]
    DuplicateDay { day: u32 },

    #[error("days {from}..={to} have no daily plan")]
    MissingDays { from: u32, to: u32 },
}
