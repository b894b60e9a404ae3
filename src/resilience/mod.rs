//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external service (LLM, scraper, database):
//!     → manager.rs (one breaker per service name)
//!     → circuit_breaker.rs (admit, run, record outcome, fallback)
//!     → timeouts.rs (optional per-call deadline)
//!
//! LLM generation:
//!     → pipeline.rs (breaker + validator, regenerate with backoff.rs delays)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breakers, created lazily from configuration
//! - The breaker never retries; regeneration lives in the pipeline
//! - Results instead of errors at the breaker boundary

pub mod backoff;
pub mod circuit_breaker;
pub mod manager;
pub mod pipeline;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::{CircuitBreaker, Fallback};
pub use manager::CircuitBreakerManager;
pub use pipeline::{GenerationOutcome, GuardedGeneration};
pub use types::{
    BreakerError, CircuitBreakerMetrics, CircuitBreakerResult, CircuitContext, CircuitState, FallbackError,
};
