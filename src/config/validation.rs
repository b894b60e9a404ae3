//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate breaker invariants (thresholds >= 1, timeouts > 0)
//! - Validate pipeline and validator ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, and again whenever a
//!   breaker is constructed from caller-supplied values

use thiserror::Error;

use crate::config::schema::{CircuitBreakerConfig, GuardConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: {field} must be at least 1")]
    ZeroThreshold { scope: String, field: &'static str },

    #[error("{scope}: {field} must be greater than 0")]
    ZeroDuration { scope: String, field: &'static str },

    #[error("pipeline: base_delay_ms ({base}) exceeds max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("{field} must be at least 1")]
    ZeroSetting { field: &'static str },
}

/// Validate a full configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    collect_breaker_errors("breakers.default", &config.breakers.default, &mut errors);
    for (service, breaker) in &config.breakers.services {
        let scope = format!("breakers.services.{}", service);
        collect_breaker_errors(&scope, breaker, &mut errors);
    }

    if config.pipeline.max_attempts == 0 {
        errors.push(ValidationError::ZeroSetting { field: "pipeline.max_attempts" });
    }
    if config.pipeline.base_delay_ms > config.pipeline.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.pipeline.base_delay_ms,
            max: config.pipeline.max_delay_ms,
        });
    }
    if config.validator.key_terms == 0 {
        errors.push(ValidationError::ZeroSetting { field: "validator.key_terms" });
    }
    if config.validator.max_gaps == 0 {
        errors.push(ValidationError::ZeroSetting { field: "validator.max_gaps" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the tuning of one breaker.
pub fn validate_breaker(scope: &str, config: &CircuitBreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    collect_breaker_errors(scope, config, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_breaker_errors(scope: &str, config: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if config.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            scope: scope.to_string(),
            field: "failure_threshold",
        });
    }
    if config.success_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            scope: scope.to_string(),
            field: "success_threshold",
        });
    }
    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            scope: scope.to_string(),
            field: "timeout_ms",
        });
    }
    if config.monitoring_window_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            scope: scope.to_string(),
            field: "monitoring_window_ms",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GuardConfig::default();
        config.breakers.default.failure_threshold = 0;
        config.breakers.default.timeout_ms = 0;
        config.pipeline.max_attempts = 0;
        config.pipeline.base_delay_ms = 10_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].to_string().contains("breakers.default"));
    }

    #[test]
    fn test_service_scope_in_message() {
        let mut config = GuardConfig::default();
        if let Some(gemini) = config.breakers.services.get_mut("gemini-api") {
            gemini.success_threshold = 0;
        }

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "breakers.services.gemini-api: success_threshold must be at least 1"
        );
    }
}
