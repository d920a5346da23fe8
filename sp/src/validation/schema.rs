//! Structural pass: field presence and types

use serde_json::{Map, Value};

use super::PlanViolation;
use crate::domain::{DailyPlan, MAX_PLAN_DAYS, Phase, StudyPlan, Task};

/// Result of the structural pass
///
/// Items that failed to parse are left out of `plan`; the flags tell the
/// semantic pass which cross-item checks would only repeat those failures.
pub(super) struct ParsedPlan {
    pub plan: StudyPlan,
    pub all_phases_parsed: bool,
    pub all_days_parsed: bool,
}

pub(super) fn parse_plan(payload: &Value, violations: &mut Vec<PlanViolation>) -> Option<ParsedPlan> {
    let Some(root) = payload.as_object() else {
        violations.push(PlanViolation::WrongType {
            path: "$".to_string(),
            expected: "an object",
        });
        return None;
    };

    let mut fields = Fields { violations };
    let overview = fields.required_string(root, "overview", "");

    let (phases, all_phases_parsed) = fields.items(root, "phases", "", parse_phase);
    if phases.is_empty() && all_phases_parsed {
        fields.violations.push(PlanViolation::NoPhases);
    }

    let (daily_plans, all_days_parsed) = fields.items(root, "dailyPlans", "", parse_daily_plan);
    if daily_plans.is_empty() && all_days_parsed {
        fields.violations.push(PlanViolation::NoDailyPlans);
    }

    Some(ParsedPlan {
        plan: StudyPlan {
            overview: overview.unwrap_or_default(),
            phases,
            daily_plans,
        },
        all_phases_parsed,
        all_days_parsed,
    })
}

fn parse_phase(fields: &mut Fields<'_>, obj: &Map<String, Value>, path: &str) -> Option<Phase> {
    let id = fields.positive(obj, "id", path);
    let name = fields.required_string(obj, "name", path);
    let description = fields.optional_string(obj, "description", path);
    let start_day = fields.day_number(obj, "startDay", path);
    let end_day = fields.day_number(obj, "endDay", path);
    let focus_areas = fields.string_list(obj, "focusAreas", path);
    let learning_goals = fields.string_list(obj, "learningGoals", path);
    let recommended_resources = fields.string_list(obj, "recommendedResources", path);

    Some(Phase {
        id: id?,
        name: name?,
        description: description?,
        start_day: start_day?,
        end_day: end_day?,
        focus_areas: focus_areas?,
        learning_goals: learning_goals?,
        recommended_resources: recommended_resources?,
    })
}

fn parse_daily_plan(fields: &mut Fields<'_>, obj: &Map<String, Value>, path: &str) -> Option<DailyPlan> {
    let day = fields.day_number(obj, "day", path);
    let phase_id = fields.positive(obj, "phaseId", path);
    let title = fields.required_string(obj, "title", path);
    let subjects = fields.string_list(obj, "subjects", path);
    let (tasks, all_tasks_parsed) = fields.items(obj, "tasks", path, parse_task);
    let review_tips = fields.optional_string(obj, "reviewTips", path);

    if !all_tasks_parsed {
        return None;
    }
    Some(DailyPlan {
        day: day?,
        phase_id: phase_id?,
        title: title?,
        subjects: subjects?,
        tasks,
        review_tips: review_tips?,
    })
}

fn parse_task(fields: &mut Fields<'_>, obj: &Map<String, Value>, path: &str) -> Option<Task> {
    let title = fields.required_string(obj, "title", path);
    let description = fields.optional_string(obj, "description", path);
    let duration_minutes = fields.positive(obj, "durationMinutes", path);
    let resources = fields.string_list(obj, "resources", path);

    Some(Task {
        title: title?,
        description: description?,
        duration_minutes: duration_minutes?,
        resources: resources?,
    })
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Field readers that record a violation instead of returning early
struct Fields<'a> {
    violations: &'a mut Vec<PlanViolation>,
}

impl Fields<'_> {
    fn missing(&mut self, path: String) {
        self.violations.push(PlanViolation::MissingField { path });
    }

    fn wrong_type(&mut self, path: String, expected: &'static str) {
        self.violations.push(PlanViolation::WrongType { path, expected });
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<String> {
        let path = join(parent, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.missing(path);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.wrong_type(path, "a string");
                None
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(String::new()),
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.wrong_type(join(parent, key), "a string");
                None
            }
        }
    }

    /// Integer >= 1; numeric strings are accepted since models often quote ids
    fn positive(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<u32> {
        let path = join(parent, key);
        let number = match obj.get(key) {
            None | Some(Value::Null) => {
                self.missing(path);
                return None;
            }
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            Some(_) => None,
        };

        match number {
            None => {
                self.wrong_type(path, "a positive integer");
                None
            }
            Some(0) => {
                self.violations.push(PlanViolation::InvalidValue {
                    path,
                    message: "must be at least 1".to_string(),
                });
                None
            }
            Some(n) => Some(n),
        }
    }

    /// Plan day in 1..=MAX_PLAN_DAYS
    fn day_number(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<u32> {
        let day = self.positive(obj, key, parent)?;
        if day > MAX_PLAN_DAYS {
            self.violations.push(PlanViolation::InvalidValue {
                path: join(parent, key),
                message: format!("must be at most {MAX_PLAN_DAYS}"),
            });
            return None;
        }
        Some(day)
    }

    fn string_list(&mut self, obj: &Map<String, Value>, key: &str, parent: &str) -> Option<Vec<String>> {
        let path = join(parent, key);
        let items = match obj.get(key) {
            None | Some(Value::Null) => return Some(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.wrong_type(path, "an array of strings");
                return None;
            }
        };

        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                _ => {
                    self.wrong_type(format!("{path}[{i}]"), "a string");
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    /// Parse an array of objects, returning the items that parsed and whether all did
    fn items<T>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
        parse: fn(&mut Self, &Map<String, Value>, &str) -> Option<T>,
    ) -> (Vec<T>, bool) {
        let path = join(parent, key);
        let items = match obj.get(key) {
            None | Some(Value::Null) => {
                self.missing(path);
                return (Vec::new(), false);
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.wrong_type(path, "an array");
                return (Vec::new(), false);
            }
        };

        let mut out = Vec::with_capacity(items.len());
        let mut all_parsed = true;
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            let parsed = match item.as_object() {
                Some(item_obj) => parse(self, item_obj, &item_path),
                None => {
                    self.wrong_type(item_path, "an object");
                    None
                }
            };
            match parsed {
                Some(value) => out.push(value),
                None => all_parsed = false,
            }
        }
        (out, all_parsed)
    }
}
