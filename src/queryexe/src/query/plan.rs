//! Reading timings and the advisor hint out of an `EXPLAIN (FORMAT JSON)` document.
//!
//! The document is a JSON array. Its last element carries the `Execution Time`
//! and `Planning Time` totals; with the advisor extension loaded the first
//! element also carries a `Bao` object holding the recommended hint.

use common::HarnessError;
use serde_json::Value;

pub const EXECUTION_TIME_KEY: &str = "Execution Time";
pub const PLANNING_TIME_KEY: &str = "Planning Time";
pub const ADVISOR_KEY: &str = "Bao";
pub const HINT_KEY: &str = "Bao recommended hint";

/// Timing totals of one analyzed execution, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTimings {
    pub execution_time_ms: f64,
    pub planning_time_ms: f64,
}

fn entries(plan: &Value) -> Result<&Vec<Value>, HarnessError> {
    match plan.as_array() {
        Some(a) if !a.is_empty() => Ok(a),
        _ => Err(HarnessError::MalformedPlan(String::from(
            "expected a non-empty array",
        ))),
    }
}

fn number(entry: &Value, key: &str) -> Result<f64, HarnessError> {
    entry
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| HarnessError::MalformedPlan(format!("missing numeric '{}'", key)))
}

/// Extracts the timing totals from the last plan entry.
pub fn extract_timings(plan: &Value) -> Result<PlanTimings, HarnessError> {
    let last = entries(plan)?
        .last()
        .ok_or_else(|| HarnessError::MalformedPlan(String::from("empty plan")))?;
    Ok(PlanTimings {
        execution_time_ms: number(last, EXECUTION_TIME_KEY)?,
        planning_time_ms: number(last, PLANNING_TIME_KEY)?,
    })
}

/// Extracts the advisor's recommended hint from the first plan entry.
///
/// The hint is reported as text whether the extension emits it as a string or
/// as an arm number.
pub fn extract_hint(plan: &Value) -> Result<String, HarnessError> {
    let hint = entries(plan)?[0]
        .get(ADVISOR_KEY)
        .and_then(|advisor| advisor.get(HINT_KEY))
        .ok_or_else(|| {
            HarnessError::MalformedPlan(format!("missing '{}.{}'", ADVISOR_KEY, HINT_KEY))
        })?;
    match hint {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(HarnessError::MalformedPlan(String::from("null hint"))),
        other => Ok(other.to_string()),
    }
}
