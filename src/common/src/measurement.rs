use crate::ModeLabel;
use serde_json::Value;

/// Result of one execution attempt of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub execution_time_ms: f64,
    pub planning_time_ms: f64,
    /// Advisor recommendation, present only when selection was enabled.
    pub hint: Option<String>,
    /// Full `EXPLAIN (FORMAT JSON)` document. `None` for failed attempts.
    pub execution_plan: Option<Value>,
    pub mode: ModeLabel,
}

impl Measurement {
    /// Successful measurement.
    pub fn new(
        execution_time_ms: f64,
        planning_time_ms: f64,
        hint: Option<String>,
        execution_plan: Value,
        mode: ModeLabel,
    ) -> Self {
        Self {
            execution_time_ms,
            planning_time_ms,
            hint,
            execution_plan: Some(execution_plan),
            mode,
        }
    }

    /// Stand-in for an attempt that failed or hit the statement timeout.
    ///
    /// Both times are set to twice the timeout so failures stand apart from
    /// legitimately slow queries.
    pub fn failed(timeout_ms: u64, mode: ModeLabel) -> Self {
        let sentinel = Self::sentinel_ms(timeout_ms);
        Self {
            execution_time_ms: sentinel,
            planning_time_ms: sentinel,
            hint: None,
            execution_plan: None,
            mode,
        }
    }

    pub fn sentinel_ms(timeout_ms: u64) -> f64 {
        2.0 * timeout_ms as f64
    }

    pub fn is_failure(&self) -> bool {
        self.execution_plan.is_none()
    }

    /// Hint as written to the results log.
    pub fn hint_label(&self) -> &str {
        self.hint.as_deref().unwrap_or("x")
    }
}
