//! Metrics collection.
//!
//! # Metrics
//! - `circuit_breaker_requests_total` (counter): calls by service, outcome
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `circuit_breaker_transitions_total` (counter): transitions by service, target state
//! - `validation_score` (histogram): score distribution by task
//! - `validation_results_total` (counter): verdicts by task, validity
//! - `toxicity_detected_total` (counter): positive scans by severity
//!
//! # Design Decisions
//! - Uses the `metrics` facade; no recorder means no cost
//! - Labels for service, task, outcome

use crate::resilience::types::CircuitState;

/// Outcome label for a guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    Rejected,
    Fallback,
}

impl CallOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Rejected => "rejected",
            CallOutcome::Fallback => "fallback",
        }
    }
}

pub fn record_breaker_request(service: &str, outcome: CallOutcome) {
    metrics::counter!(
        "circuit_breaker_requests_total",
        "service" => service.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_transition(service: &str, to: CircuitState) {
    metrics::counter!(
        "circuit_breaker_transitions_total",
        "service" => service.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
    metrics::gauge!("circuit_breaker_state", "service" => service.to_string()).set(to.as_gauge());
}

pub fn record_validation(task: &'static str, score: f64, valid: bool) {
    metrics::histogram!("validation_score", "task" => task).record(score);
    metrics::counter!(
        "validation_results_total",
        "task" => task,
        "valid" => if valid { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_toxicity(severity: &'static str) {
    metrics::counter!("toxicity_detected_total", "severity" => severity).increment(1);
}
