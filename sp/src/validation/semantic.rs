//! Semantic pass: phase ordering and day coverage

use std::collections::{BTreeSet, HashMap, HashSet};

use super::PlanViolation;
use super::schema::ParsedPlan;
use crate::domain::Phase;

pub(super) fn check(parsed: &ParsedPlan, violations: &mut Vec<PlanViolation>) {
    let plan = &parsed.plan;
    check_phase_ids(&plan.phases, violations);
    check_phase_ranges(&plan.phases, violations);
    if parsed.all_phases_parsed {
        check_phase_references(parsed, violations);
    }
    check_days(parsed, violations);
}

fn check_phase_ids(phases: &[Phase], violations: &mut Vec<PlanViolation>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for phase in phases {
        if !seen.insert(phase.id) && reported.insert(phase.id) {
            violations.push(PlanViolation::DuplicatePhaseId { id: phase.id });
        }
    }
}

/// Phases sorted by start day must tile the day range without gaps or overlap
fn check_phase_ranges(phases: &[Phase], violations: &mut Vec<PlanViolation>) {
    let mut ordered: Vec<&Phase> = Vec::with_capacity(phases.len());
    for phase in phases {
        if phase.start_day > phase.end_day {
            violations.push(PlanViolation::InvertedPhase {
                id: phase.id,
                start_day: phase.start_day,
                end_day: phase.end_day,
            });
        } else {
            ordered.push(phase);
        }
    }
    ordered.sort_by_key(|p| (p.start_day, p.end_day));

    // Compare against the furthest-reaching phase so far, not just the previous one
    let mut reach: Option<&Phase> = None;
    for phase in ordered {
        if let Some(prev) = reach {
            if phase.start_day <= prev.end_day {
                violations.push(PlanViolation::PhaseOverlap {
                    first: prev.id,
                    first_end: prev.end_day,
                    second: phase.id,
                    second_start: phase.start_day,
                });
            } else if phase.start_day > prev.end_day.saturating_add(1) {
                violations.push(PlanViolation::PhaseGap {
                    before: prev.id,
                    after: phase.id,
                    from: prev.end_day + 1,
                    to: phase.start_day - 1,
                });
            }
            if phase.end_day <= prev.end_day {
                continue;
            }
        }
        reach = Some(phase);
    }
}

fn check_phase_references(parsed: &ParsedPlan, violations: &mut Vec<PlanViolation>) {
    let mut by_id: HashMap<u32, &Phase> = HashMap::new();
    for phase in &parsed.plan.phases {
        by_id.entry(phase.id).or_insert(phase);
    }

    for daily in &parsed.plan.daily_plans {
        match by_id.get(&daily.phase_id) {
            None => violations.push(PlanViolation::UnknownPhase {
                day: daily.day,
                phase_id: daily.phase_id,
            }),
            Some(phase) if !phase.contains(daily.day) => violations.push(PlanViolation::DayOutsidePhase {
                day: daily.day,
                phase_id: phase.id,
                start_day: phase.start_day,
                end_day: phase.end_day,
            }),
            Some(_) => {}
        }
    }
}

/// Days must be unique and cover 1..=max without holes
fn check_days(parsed: &ParsedPlan, violations: &mut Vec<PlanViolation>) {
    let mut days = BTreeSet::new();
    let mut reported = HashSet::new();
    for daily in &parsed.plan.daily_plans {
        if !days.insert(daily.day) && reported.insert(daily.day) {
            violations.push(PlanViolation::DuplicateDay { day: daily.day });
        }
    }

    if !parsed.all_days_parsed {
        return;
    }

    let mut expected = 1u32;
    for &day in &days {
        if day > expected {
            violations.push(PlanViolation::MissingDays {
                from: expected,
                to: day - 1,
            });
        }
        expected = day.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyPlan, StudyPlan};

    fn daily(day: u32) -> DailyPlan {
        DailyPlan {
            day,
            phase_id: 1,
            title: format!("Day {day}"),
            subjects: Vec::new(),
            tasks: Vec::new(),
            review_tips: String::new(),
        }
    }

    fn parsed(days: &[u32]) -> ParsedPlan {
        ParsedPlan {
            plan: StudyPlan {
                overview: String::new(),
                phases: Vec::new(),
                daily_plans: days.iter().copied().map(daily).collect(),
            },
            all_phases_parsed: true,
            all_days_parsed: true,
        }
    }

    #[test]
    fn test_day_coverage_at_integer_limit() {
        let mut violations = Vec::new();
        check_days(&parsed(&[1, u32::MAX]), &mut violations);
        assert_eq!(
            violations,
            vec![PlanViolation::MissingDays {
                from: 2,
                to: u32::MAX - 1
            }]
        );
    }

    #[test]
    fn test_day_coverage_reports_each_hole() {
        let mut violations = Vec::new();
        check_days(&parsed(&[2, 3, 6]), &mut violations);
        assert_eq!(
            violations,
            vec![
                PlanViolation::MissingDays { from: 1, to: 1 },
                PlanViolation::MissingDays { from: 4, to: 5 },
            ]
        );
    }
}
