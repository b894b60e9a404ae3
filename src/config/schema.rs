//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.
//! Durations are stored as milliseconds so TOML files stay flat.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service name of the hosted LLM.
pub const GEMINI_SERVICE: &str = "gemini-api";
/// Service name of the web crawler.
pub const FIRECRAWL_SERVICE: &str = "firecrawl-api";
/// Service name of the document database.
pub const FIRESTORE_SERVICE: &str = "firestore";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Circuit breaker defaults, global and per service.
    pub breakers: BreakerSettings,

    /// Response validator settings.
    pub validator: ValidatorConfig,

    /// Guarded generation (regenerate on rejection) settings.
    pub pipeline: PipelineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Tuning for a single circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures (within the monitoring window) before the circuit opens.
    pub failure_threshold: u32,

    /// Successes while half-open before the circuit closes.
    pub success_threshold: u32,

    /// Time the circuit stays open before a trial call is allowed.
    pub timeout_ms: u64,

    /// Window in which failures accumulate towards the threshold.
    pub monitoring_window_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, success_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            timeout_ms: millis_ceil(timeout),
            ..Self::default()
        }
    }

    pub fn with_monitoring_window(mut self, window: Duration) -> Self {
        self.monitoring_window_ms = millis_ceil(window);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn monitoring_window(&self) -> Duration {
        Duration::from_millis(self.monitoring_window_ms)
    }
}

/// Whole milliseconds, rounded up so a sub-millisecond duration is not zero.
fn millis_ceil(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_ms: 30_000,
            monitoring_window_ms: 60_000,
        }
    }
}

/// Breaker defaults used by the registry when a caller supplies no config.
///
/// A `[breakers.services]` table in a config file replaces the built-in
/// per-service entries as a whole.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Used for any service without an explicit entry.
    pub default: CircuitBreakerConfig,

    /// Per-service overrides keyed by service name.
    pub services: BTreeMap<String, CircuitBreakerConfig>,
}

impl BreakerSettings {
    /// Effective config for a service.
    pub fn for_service(&self, service: &str) -> CircuitBreakerConfig {
        self.services.get(service).copied().unwrap_or(self.default)
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        // The LLM is slow to recover and expensive to hammer.
        services.insert(
            GEMINI_SERVICE.to_string(),
            CircuitBreakerConfig {
                failure_threshold: 3,
                success_threshold: 2,
                timeout_ms: 60_000,
                monitoring_window_ms: 300_000,
            },
        );
        services.insert(
            FIRECRAWL_SERVICE.to_string(),
            CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                timeout_ms: 30_000,
                monitoring_window_ms: 120_000,
            },
        );
        services.insert(
            FIRESTORE_SERVICE.to_string(),
            CircuitBreakerConfig {
                failure_threshold: 10,
                success_threshold: 3,
                timeout_ms: 10_000,
                monitoring_window_ms: 60_000,
            },
        );

        Self {
            default: CircuitBreakerConfig::default(),
            services,
        }
    }
}

/// Response validator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Model identifier recorded in validation metadata.
    pub model: String,

    /// Upper bound on gaps before the result is flagged as over-extracted.
    pub max_gaps: usize,

    /// Number of most frequent source words used as key terms.
    pub key_terms: usize,

    /// Minimum length of a source word to count as a key term.
    pub key_term_min_len: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            max_gaps: 10,
            key_terms: 50,
            key_term_min_len: 6,
        }
    }
}

/// Guarded generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum generation attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let config = CircuitBreakerConfig::new(1, 1, Duration::from_micros(200))
            .with_monitoring_window(Duration::from_micros(1_500));
        assert_eq!(config.timeout_ms, 1);
        assert_eq!(config.monitoring_window_ms, 2);

        assert_eq!(CircuitBreakerConfig::new(1, 1, Duration::from_secs(2)).timeout_ms, 2_000);
    }

    #[test]
    fn test_llm_breaker_is_stricter_than_database() {
        let settings = BreakerSettings::default();
        let llm = settings.for_service(GEMINI_SERVICE);
        let db = settings.for_service(FIRESTORE_SERVICE);

        assert!(llm.failure_threshold < db.failure_threshold);
        assert!(llm.timeout() > db.timeout());
    }

    #[test]
    fn test_unknown_service_uses_default() {
        let settings = BreakerSettings::default();
        assert_eq!(settings.for_service("arxiv"), CircuitBreakerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [breakers.default]
            failure_threshold = 1

            [validator]
            model = "gemini-1.5-pro"
            "#,
        )
        .unwrap();

        assert_eq!(config.breakers.default.failure_threshold, 1);
        assert_eq!(config.breakers.default.timeout_ms, 30_000);
        assert_eq!(config.validator.model, "gemini-1.5-pro");
        assert_eq!(config.validator.max_gaps, 10);
        assert!(config.breakers.services.contains_key(GEMINI_SERVICE));
    }
}
