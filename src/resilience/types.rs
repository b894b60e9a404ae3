//! Circuit breaker types and error definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

/// Externally visible circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failing fast, calls never reach the service.
    Open,
    /// Trial calls probe whether the service recovered.
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Why a guarded call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// The breaker refused the attempt.
    #[error("Circuit breaker is OPEN for {service}. Retry after {}ms", .retry_in.as_millis())]
    Open { service: String, retry_in: Duration },

    /// The wrapped operation returned an error.
    #[error("{0}")]
    Operation(String),

    /// The wrapped operation exceeded its deadline.
    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// A fallback could not produce a substitute value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FallbackError(pub String);

impl FallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Call-site information handed to fallbacks.
#[derive(Debug, Clone)]
pub struct CircuitContext {
    /// Logical operation name, e.g. `extract-gaps`.
    pub operation: String,
    /// Filled in by the breaker that runs the call.
    pub service: String,
    /// Wall-clock time the context was created.
    pub timestamp: SystemTime,
    /// Caller-side attempt number, starting at 1.
    pub attempt: u32,
    pub metadata: BTreeMap<String, Value>,
    /// Deadline for the wrapped operation. Expiry counts as a failure.
    pub timeout: Option<Duration>,
}

impl CircuitContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            service: String::new(),
            timestamp: SystemTime::now(),
            attempt: 1,
            metadata: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn for_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self::new("operation")
    }
}

/// Outcome of `CircuitBreaker::execute`.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerResult<T> {
    pub success: bool,
    /// The operation's value, or the fallback's value when `from_cache` is set.
    pub data: Option<T>,
    pub error: Option<String>,
    /// True when a fallback answered instead of the real operation.
    pub from_cache: bool,
    /// State after this call.
    pub circuit_state: CircuitState,
}

impl<T> CircuitBreakerResult<T> {
    pub(crate) fn succeeded(data: T, from_cache: bool, circuit_state: CircuitState) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            from_cache,
            circuit_state,
        }
    }

    pub(crate) fn failed(error: String, circuit_state: CircuitState) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            from_cache: false,
            circuit_state,
        }
    }

    /// Convert into a plain `Result`, dropping the bookkeeping fields.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "no data".to_string())),
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure: Option<Instant>,
    pub last_success: Option<Instant>,
    /// Only set while the circuit is open.
    pub next_retry: Option<Instant>,
    /// Every call ever made through the breaker, rejected ones included.
    pub total_requests: u64,
}
