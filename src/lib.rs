//! Resilience and response-validation core for LLM-backed research tools.
//!
//! Guards calls to external services with per-service circuit breakers and
//! scores LLM responses (gap extraction, research proposals, red-team
//! analyses) before anything downstream trusts them.

pub mod config;
pub mod observability;
pub mod resilience;
pub mod validation;

pub use config::GuardConfig;
pub use resilience::{CircuitBreaker, CircuitBreakerManager, GuardedGeneration};
pub use validation::{ResponseValidator, ValidationResult};
