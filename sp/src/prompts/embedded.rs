//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

/// System instruction sent ahead of every plan request
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// Study plan request template (handlebars)
pub const STUDY_PLAN: &str = include_str!("../../prompts/study-plan.pmt");
