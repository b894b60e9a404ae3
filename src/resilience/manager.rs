//! Registry of circuit breakers keyed by service name.
//!
//! # Responsibilities
//! - Create breakers lazily on first use
//! - Hand every caller of the same service the same breaker
//! - Snapshot and reset all breakers
//!
//! # Design Decisions
//! - An owned value passed to call sites (usually behind `Arc`), not a global
//! - Entry-based get-or-insert so concurrent first calls never build duplicates
//! - The first caller's config wins until the breaker is removed

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::{BreakerSettings, CircuitBreakerConfig, ConfigError};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::types::CircuitBreakerMetrics;

#[derive(Debug, Default)]
pub struct CircuitBreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: BreakerSettings,
}

impl CircuitBreakerManager {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            breakers: DashMap::new(),
            settings,
        }
    }

    /// Get the breaker for `service`, creating it on first use.
    ///
    /// `config` only matters on the call that creates the breaker; without
    /// one, the configured defaults for the service apply.
    pub fn get_breaker(
        &self,
        service: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> Result<Arc<CircuitBreaker>, ConfigError> {
        match self.breakers.entry(service.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let config = config.unwrap_or_else(|| self.settings.for_service(service));
                let breaker = Arc::new(CircuitBreaker::new(service, config)?);

                tracing::info!(
                    service,
                    failure_threshold = config.failure_threshold,
                    success_threshold = config.success_threshold,
                    timeout_ms = config.timeout_ms,
                    "Circuit breaker registered"
                );
                entry.insert(Arc::clone(&breaker));
                Ok(breaker)
            }
        }
    }

    /// Drop a breaker so the next `get_breaker` builds a fresh one.
    pub fn remove_breaker(&self, service: &str) -> bool {
        self.breakers.remove(service).is_some()
    }

    pub fn all_metrics(&self) -> BTreeMap<String, CircuitBreakerMetrics> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metrics()))
            .collect()
    }

    /// Force every breaker closed.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().force_close();
        }
        tracing::info!(count = self.breakers.len(), "All circuit breakers reset");
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FIRESTORE_SERVICE, GEMINI_SERVICE};
    use crate::resilience::types::CircuitState;
    use std::time::Duration;

    #[test]
    fn test_same_instance_per_service() {
        let manager = CircuitBreakerManager::default();
        let a = manager.get_breaker(GEMINI_SERVICE, None).unwrap();
        let b = manager.get_breaker(GEMINI_SERVICE, None).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        a.force_open();
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn test_defaults_per_service() {
        let manager = CircuitBreakerManager::default();
        let llm = manager.get_breaker(GEMINI_SERVICE, None).unwrap();
        let db = manager.get_breaker(FIRESTORE_SERVICE, None).unwrap();
        let other = manager.get_breaker("semantic-scholar", None).unwrap();

        assert_eq!(llm.config().failure_threshold, 3);
        assert_eq!(db.config().failure_threshold, 10);
        assert_eq!(*other.config(), CircuitBreakerConfig::default());
    }

    #[test]
    fn test_first_config_wins_until_removed() {
        let manager = CircuitBreakerManager::default();
        let first = CircuitBreakerConfig::new(1, 1, Duration::from_secs(1));
        let second = CircuitBreakerConfig::new(9, 9, Duration::from_secs(9));

        manager.get_breaker("crawler", Some(first)).unwrap();
        let same = manager.get_breaker("crawler", Some(second)).unwrap();
        assert_eq!(*same.config(), first);

        assert!(manager.remove_breaker("crawler"));
        assert!(!manager.remove_breaker("crawler"));
        let fresh = manager.get_breaker("crawler", Some(second)).unwrap();
        assert_eq!(*fresh.config(), second);
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let manager = CircuitBreakerManager::default();
        let bad = CircuitBreakerConfig::new(0, 1, Duration::from_secs(1));

        assert!(manager.get_breaker("crawler", Some(bad)).is_err());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_reset_all_and_metrics() {
        let manager = CircuitBreakerManager::default();
        manager.get_breaker("a", None).unwrap().force_open();
        manager.get_breaker("b", None).unwrap().force_open();

        let metrics = manager.all_metrics();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.values().all(|m| m.state == CircuitState::Open));

        manager.reset_all();
        assert!(manager.all_metrics().values().all(|m| m.state == CircuitState::Closed));
        assert_eq!(manager.service_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
