//! Circuit breaker for external service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast (or hit the fallback)
//! - Half-Open: testing if service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold within monitoring window
//! Open → Half-Open: first call after the retry deadline
//! Half-Open → Closed: success_count >= success_threshold
//! Half-Open → Open: any failure (retry deadline restarts)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker (not global)
//! - Transitions are a pure function over `Machine`; the breaker only
//!   serializes access to it
//! - The wrapped operation is awaited outside the lock
//! - `execute` never returns an error; callers inspect `CircuitBreakerResult`

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::config::validation::validate_breaker;
use crate::config::{CircuitBreakerConfig, ConfigError};
use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::timeouts::with_deadline;
use crate::resilience::types::{
    BreakerError, CircuitBreakerMetrics, CircuitBreakerResult, CircuitContext, CircuitState, FallbackError,
};

/// Circuit state together with the counters that gate its transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Closed {
        failures: u32,
        window_start: Option<Instant>,
    },
    Open {
        failures: u32,
        retry_at: Instant,
    },
    HalfOpen {
        failures: u32,
        successes: u32,
    },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A call wants to run; lets an expired open circuit go half-open.
    Probe,
    Success,
    Failure,
    ForceOpen,
    ForceClose,
}

impl Machine {
    pub fn closed() -> Self {
        Machine::Closed {
            failures: 0,
            window_start: None,
        }
    }

    /// Next state after `event` at time `now`.
    pub fn apply(self, event: Event, config: &CircuitBreakerConfig, now: Instant) -> Machine {
        let reopen = |failures: u32| Machine::Open {
            failures,
            retry_at: now + config.timeout(),
        };

        match (self, event) {
            (_, Event::ForceClose) => Machine::closed(),
            (machine, Event::ForceOpen) => reopen(machine.failures()),

            (Machine::Open { failures, retry_at }, Event::Probe) if now >= retry_at => Machine::HalfOpen {
                failures,
                successes: 0,
            },
            (machine, Event::Probe) => machine,

            (Machine::Closed { .. }, Event::Success) => Machine::closed(),
            (Machine::HalfOpen { failures, successes }, Event::Success) => {
                let successes = successes.saturating_add(1);
                if successes >= config.success_threshold {
                    Machine::closed()
                } else {
                    Machine::HalfOpen { failures, successes }
                }
            }
            // A call admitted before the circuit opened finished late.
            (machine @ Machine::Open { .. }, Event::Success) => machine,

            (Machine::Closed { failures, window_start }, Event::Failure) => {
                let (failures, start) = match window_start {
                    Some(start) if now.saturating_duration_since(start) <= config.monitoring_window() => {
                        (failures.saturating_add(1), start)
                    }
                    _ => (1, now),
                };
                if failures >= config.failure_threshold {
                    reopen(failures)
                } else {
                    Machine::Closed {
                        failures,
                        window_start: Some(start),
                    }
                }
            }
            (Machine::HalfOpen { failures, .. }, Event::Failure) => reopen(failures.saturating_add(1)),
            (Machine::Open { failures, retry_at }, Event::Failure) => Machine::Open {
                failures: failures.saturating_add(1),
                retry_at,
            },
        }
    }

    pub fn state(&self) -> CircuitState {
        match self {
            Machine::Closed { .. } => CircuitState::Closed,
            Machine::Open { .. } => CircuitState::Open,
            Machine::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn failures(&self) -> u32 {
        match *self {
            Machine::Closed { failures, .. } | Machine::Open { failures, .. } | Machine::HalfOpen { failures, .. } => {
                failures
            }
        }
    }

    pub fn successes(&self) -> u32 {
        match *self {
            Machine::HalfOpen { successes, .. } => successes,
            _ => 0,
        }
    }

    pub fn retry_at(&self) -> Option<Instant> {
        match *self {
            Machine::Open { retry_at, .. } => Some(retry_at),
            _ => None,
        }
    }

    /// Whether a call may reach the wrapped operation.
    pub fn admits(&self) -> bool {
        !matches!(self, Machine::Open { .. })
    }
}

/// Boxed future returned by a fallback.
pub type FallbackFuture = BoxFuture<'static, Result<Value, FallbackError>>;

/// Produces a substitute value when the primary operation is unavailable.
///
/// Values are JSON so one breaker can serve callers of any payload type;
/// `execute` deserializes into the caller's type.
pub trait Fallback: Send + Sync {
    fn recover(&self, error: BreakerError, context: CircuitContext) -> FallbackFuture;
}

impl<F, Fut> Fallback for F
where
    F: Fn(BreakerError, CircuitContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, FallbackError>> + Send + 'static,
{
    fn recover(&self, error: BreakerError, context: CircuitContext) -> FallbackFuture {
        Box::pin(self(error, context))
    }
}

#[derive(Debug)]
struct Inner {
    machine: Machine,
    last_failure: Option<Instant>,
    last_success: Option<Instant>,
}

/// Guards one external service.
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    total_requests: AtomicU64,
    fallback: RwLock<Option<Arc<dyn Fallback>>>,
}

impl CircuitBreaker {
    /// Create a closed breaker. Fails if the config breaks its invariants.
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        let service = service.into();
        validate_breaker(&service, &config).map_err(ConfigError::Validation)?;

        Ok(Self {
            service,
            config,
            inner: Mutex::new(Inner {
                machine: Machine::closed(),
                last_failure: None,
                last_success: None,
            }),
            total_requests: AtomicU64::new(0),
            fallback: RwLock::new(None),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Register the fallback, replacing any previous one.
    pub fn set_fallback<H>(&self, handler: H)
    where
        H: Fallback + 'static,
    {
        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn clear_fallback(&self) {
        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Run `operation` if the circuit allows it.
    ///
    /// Failures, rejections and timeouts are reported in the result, after
    /// the fallback (if any) had a chance to answer.
    pub async fn execute<T, E, F, Fut>(&self, operation: F, context: CircuitContext) -> CircuitBreakerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        T: DeserializeOwned,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let context = context.for_service(&self.service);

        if let Err(rejection) = self.admit() {
            tracing::debug!(
                service = %self.service,
                operation = %context.operation,
                "Call rejected by open circuit"
            );
            metrics::record_breaker_request(&self.service, CallOutcome::Rejected);
            return self.recover(rejection, context).await;
        }

        match with_deadline(operation(), context.timeout).await {
            Ok(data) => {
                self.record(Event::Success);
                metrics::record_breaker_request(&self.service, CallOutcome::Success);
                CircuitBreakerResult::succeeded(data, false, self.state())
            }
            Err(error) => {
                tracing::warn!(
                    service = %self.service,
                    operation = %context.operation,
                    attempt = context.attempt,
                    error = %error,
                    "Guarded operation failed"
                );
                self.record(Event::Failure);
                metrics::record_breaker_request(&self.service, CallOutcome::Failure);
                self.recover(error, context).await
            }
        }
    }

    /// Manually open the circuit.
    pub fn force_open(&self) {
        tracing::warn!(service = %self.service, "Circuit breaker forced open");
        self.record(Event::ForceOpen);
    }

    /// Manually close the circuit, clearing all counters.
    pub fn force_close(&self) {
        tracing::info!(service = %self.service, "Circuit breaker forced closed");
        self.record(Event::ForceClose);
    }

    pub fn state(&self) -> CircuitState {
        self.lock().machine.state()
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();
        CircuitBreakerMetrics {
            state: inner.machine.state(),
            failure_count: inner.machine.failures(),
            success_count: inner.machine.successes(),
            last_failure: inner.last_failure,
            last_success: inner.last_success,
            next_retry: inner.machine.retry_at(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<(), BreakerError> {
        let now = Instant::now();
        let mut inner = self.lock();
        self.transition(&mut inner, Event::Probe, now);

        match inner.machine {
            Machine::Open { retry_at, .. } => Err(BreakerError::Open {
                service: self.service.clone(),
                retry_in: retry_at.saturating_duration_since(now),
            }),
            _ => Ok(()),
        }
    }

    fn record(&self, event: Event) {
        let now = Instant::now();
        let mut inner = self.lock();
        match event {
            Event::Success => inner.last_success = Some(now),
            Event::Failure => inner.last_failure = Some(now),
            _ => {}
        }
        self.transition(&mut inner, event, now);
    }

    fn transition(&self, inner: &mut Inner, event: Event, now: Instant) {
        let before = inner.machine;
        let after = before.apply(event, &self.config, now);
        inner.machine = after;

        if before.state() == after.state() {
            // Forcing open an open circuit still restarts its timer.
            return;
        }

        match after {
            Machine::Open { failures, retry_at } => tracing::warn!(
                service = %self.service,
                failures,
                retry_in_ms = retry_at.saturating_duration_since(now).as_millis() as u64,
                "Circuit breaker opened"
            ),
            Machine::HalfOpen { .. } => tracing::info!(
                service = %self.service,
                "Circuit breaker half-open, probing service"
            ),
            Machine::Closed { .. } => tracing::info!(
                service = %self.service,
                from = %before.state(),
                "Circuit breaker closed"
            ),
        }
        metrics::record_transition(&self.service, after.state());
    }

    async fn recover<T>(&self, error: BreakerError, context: CircuitContext) -> CircuitBreakerResult<T>
    where
        T: DeserializeOwned,
    {
        let fallback = self.fallback.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(fallback) = fallback else {
            return CircuitBreakerResult::failed(error.to_string(), self.state());
        };

        let primary = error.to_string();
        let recovered = fallback.recover(error, context).await.and_then(|value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| FallbackError::new(format!("fallback value has the wrong shape: {}", e)))
        });

        match recovered {
            Ok(data) => {
                tracing::info!(service = %self.service, primary_error = %primary, "Served fallback value");
                metrics::record_breaker_request(&self.service, CallOutcome::Fallback);
                CircuitBreakerResult::succeeded(data, true, self.state())
            }
            Err(fallback_error) => {
                tracing::error!(
                    service = %self.service,
                    primary_error = %primary,
                    fallback_error = %fallback_error,
                    "Fallback failed"
                );
                CircuitBreakerResult::failed(
                    format!("Primary and fallback both failed: {}; {}", primary, fallback_error),
                    self.state(),
                )
            }
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
