//! ResponseExtractor - recover a JSON object from free-form model output
//!
//! Strategies run in order of decreasing confidence and the first success
//! wins. The brace scan is the most permissive and must stay last: it happily
//! matches braces that belong to surrounding prose.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap_or_else(|e| unreachable!("fence regex: {e}"))
});

static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap_or_else(|e| unreachable!("brace regex: {e}")));

/// How a payload was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole text parsed as JSON
    Direct,
    /// Interior of a fenced code block
    FencedBlock,
    /// First `{` through last `}`
    BraceSpan,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::FencedBlock => "fenced_block",
            Self::BraceSpan => "brace_span",
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recovered JSON object and the strategy that found it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub payload: Value,
    pub strategy: ExtractionStrategy,
}

/// Why one strategy did not produce a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: ExtractionStrategy,
    pub message: String,
}

/// Every strategy failed
///
/// Carries the raw length and diagnostics only, never the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no JSON object recovered from {raw_length} chars of model output: {first_failure}")]
pub struct ExtractionError {
    pub raw_length: usize,
    pub first_failure: String,
    /// One entry per strategy, in the order tried
    pub failures: Vec<StrategyFailure>,
}

type ParseFn = fn(&str) -> Result<Value, String>;

const STRATEGIES: [(ExtractionStrategy, ParseFn); 3] = [
    (ExtractionStrategy::Direct, parse_direct),
    (ExtractionStrategy::FencedBlock, parse_fenced),
    (ExtractionStrategy::BraceSpan, parse_brace_span),
];

fn parse_object(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("top-level JSON is {}, expected an object", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_direct(text: &str) -> Result<Value, String> {
    parse_object(text.trim())
}

fn parse_fenced(text: &str) -> Result<Value, String> {
    let captures = FENCED_BLOCK
        .captures(text)
        .ok_or_else(|| "no fenced code block".to_string())?;
    let interior = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    parse_object(interior.trim())
}

fn parse_brace_span(text: &str) -> Result<Value, String> {
    let span = BRACE_SPAN
        .find(text)
        .ok_or_else(|| "no brace-delimited span".to_string())?;
    parse_object(span.as_str())
}

/// Recover a JSON object from raw model output
pub fn extract(raw: &str) -> Result<Extracted, ExtractionError> {
    debug!(raw_length = raw.len(), "extract: called");
    let mut failures = Vec::new();

    for (strategy, parse) in STRATEGIES {
        match parse(raw) {
            Ok(payload) => {
                info!(%strategy, raw_length = raw.len(), "Extracted JSON payload");
                return Ok(Extracted { payload, strategy });
            }
            Err(message) => {
                debug!(%strategy, %message, "extract: strategy failed");
                failures.push(StrategyFailure { strategy, message });
            }
        }
    }

    Err(ExtractionError {
        raw_length: raw.len(),
        first_failure: failures.first().map(|f| f.message.clone()).unwrap_or_default(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const FENCED_FIXTURE: &str = r#"```json
{
  "overview": "A 30 day plan focused on fundamentals",
  "phases": [
    {
      "id": 1,
      "name": "Foundations",
      "description": "Core concepts",
      "startDay": 1,
      "endDay": 30,
      "focusAreas": ["Algebra"],
      "learningGoals": ["Solve linear equations"],
      "recommendedResources": ["Textbook ch. 1-3"]
    }
  ],
  "dailyPlans": [
    {
      "day": 1,
      "phaseId": 1,
      "title": "Getting started",
      "subjects": ["Mathematics"],
      "tasks": [
        {
          "title": "Linear equations",
          "description": "Work through exercises 1-20",
          "durationMinutes": 60,
          "resources": ["Textbook"]
        }
      ],
      "reviewTips": "Redo the mistakes"
    }
  ]
}
```"#;

    #[test]
    fn test_direct_json_uses_first_strategy() {
        let raw = r#"{"overview":"x","phases":[],"dailyPlans":[]}"#;
        let extracted = extract(raw).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::Direct);
        assert_eq!(extracted.payload, json!({"overview": "x", "phases": [], "dailyPlans": []}));
    }

    #[test]
    fn test_direct_json_with_fence_inside_string_stays_direct() {
        let raw = r#"{"overview":"use ```code``` sparingly","phases":[],"dailyPlans":[]}"#;
        let extracted = extract(raw).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::Direct);
    }

    #[test]
    fn test_fenced_block_unwraps() {
        let extracted = extract(FENCED_FIXTURE).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::FencedBlock);

        let plan = crate::validation::validate_plan(&extracted.payload).unwrap();
        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.phases[0].start_day, 1);
        assert_eq!(plan.phases[0].end_day, 30);
        assert_eq!(plan.daily_plans.len(), 1);
        assert_eq!(plan.daily_plans[0].day, 1);
        assert_eq!(plan.daily_plans[0].phase_id, 1);
    }

    #[test]
    fn test_fenced_block_without_language_tag_and_prose() {
        let raw = "Here is your plan:\n```\n{\"overview\":\"y\"}\n```\nGood luck!";
        let extracted = extract(raw).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::FencedBlock);
        assert_eq!(extracted.payload["overview"], "y");
    }

    #[test]
    fn test_single_line_fence_unwraps() {
        for raw in [
            "```json {\"overview\":\"x\"} ```",
            "Plan: ```{\"overview\":\"x\"}``` done",
        ] {
            let extracted = extract(raw).unwrap();
            assert_eq!(extracted.strategy, ExtractionStrategy::FencedBlock, "{raw}");
            assert_eq!(extracted.payload["overview"], "x");
        }
    }

    #[test]
    fn test_prose_around_object_uses_brace_span() {
        let raw = "Sure! Below is the plan you asked for.\n{\"overview\": \"z\", \"phases\": []}\nLet me know if you need changes.";
        let extracted = extract(raw).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::BraceSpan);
        assert_eq!(extracted.payload["overview"], "z");
    }

    #[test]
    fn test_no_braces_fails_with_diagnostics() {
        let raw = "I'm sorry, I can't help with that request.";
        let err = extract(raw).unwrap_err();
        assert_eq!(err.raw_length, raw.len());
        assert_eq!(err.failures.len(), 3);
        assert_eq!(err.failures[0].strategy, ExtractionStrategy::Direct);
        assert_eq!(err.failures[1].message, "no fenced code block");
        assert_eq!(err.failures[2].message, "no brace-delimited span");
        assert_eq!(err.first_failure, err.failures[0].message);
        assert!(!err.to_string().contains("sorry"));
    }

    #[test]
    fn test_truncated_object_fails() {
        let err = extract("{\"overview\": \"cut off").unwrap_err();
        assert_eq!(err.failures.len(), 3);
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let err = extract("[1, 2, 3]").unwrap_err();
        assert!(err.first_failure.contains("an array"));
    }

    #[test]
    fn test_empty_input() {
        let err = extract("").unwrap_err();
        assert_eq!(err.raw_length, 0);
    }

    fn json_object() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 {}`]{0,12}".prop_map(Value::String),
        ];
        let value = leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        proptest::collection::btree_map("[a-z]{1,8}", value, 0..6).prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_extract_is_idempotent(object in json_object(), pretty in any::<bool>()) {
            let text = if pretty {
                serde_json::to_string_pretty(&object).unwrap()
            } else {
                serde_json::to_string(&object).unwrap()
            };

            let first = extract(&text).unwrap();
            prop_assert_eq!(first.strategy, ExtractionStrategy::Direct);

            let again = extract(&serde_json::to_string(&first.payload).unwrap()).unwrap();
            prop_assert_eq!(&again.payload, &first.payload);
            prop_assert_eq!(&again.payload, &object);
        }

        #[test]
        fn prop_wrapping_preserves_payload(object in json_object()) {
            let body = serde_json::to_string_pretty(&object).unwrap();

            let fenced = format!("```json\n{body}\n```");
            prop_assert_eq!(extract(&fenced).unwrap().payload, object.clone());

            let prose = format!("Here you go:\n{body}\nThanks.");
            prop_assert_eq!(extract(&prose).unwrap().payload, object);
        }
    }
}
