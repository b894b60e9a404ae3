//! Guarded generation: breaker, validation and regeneration in one loop.
//!
//! # Flow (per attempt)
//! ```text
//! generate(attempt)
//!     → CircuitBreaker::execute (fallback may answer)
//!     → ResponseValidator::validate
//!     → accepted: return
//!     → rejected or failed: backoff.rs delay, try again
//! ```
//!
//! An open circuit ends the loop early; waiting out the backoff would only
//! produce another rejection.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::types::{CircuitContext, CircuitState};
use crate::validation::{ResponseValidator, ValidationResult, ValidationTask};

/// What a guarded generation produced.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// A response passed validation.
    Accepted { result: ValidationResult, attempts: u32 },
    /// Every response was rejected; carries the best-scoring one.
    Rejected { result: ValidationResult, attempts: u32 },
    /// No response was obtained at all.
    Unavailable { error: String, attempts: u32 },
}

impl GenerationOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            GenerationOutcome::Accepted { attempts, .. }
            | GenerationOutcome::Rejected { attempts, .. }
            | GenerationOutcome::Unavailable { attempts, .. } => *attempts,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, GenerationOutcome::Accepted { .. })
    }

    pub fn result(&self) -> Option<&ValidationResult> {
        match self {
            GenerationOutcome::Accepted { result, .. } | GenerationOutcome::Rejected { result, .. } => Some(result),
            GenerationOutcome::Unavailable { .. } => None,
        }
    }
}

pub struct GuardedGeneration {
    breaker: Arc<CircuitBreaker>,
    validator: ResponseValidator,
    config: PipelineConfig,
}

impl GuardedGeneration {
    pub fn new(breaker: Arc<CircuitBreaker>, validator: ResponseValidator, config: PipelineConfig) -> Self {
        Self {
            breaker,
            validator,
            config,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Generate until a response is accepted or attempts run out.
    ///
    /// `generate` receives the 1-based attempt number.
    pub async fn run<E, F, Fut>(&self, task: &ValidationTask, operation: &str, mut generate: F) -> GenerationOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let base = Duration::from_millis(self.config.base_delay_ms);
        let max = Duration::from_millis(self.config.max_delay_ms);

        let mut best: Option<ValidationResult> = None;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let context = CircuitContext::new(operation)
                .with_attempt(attempt)
                .with_metadata("task", task.name());
            let response = self
                .breaker
                .execute(|| generate(attempt), context)
                .await;

            match response.into_result() {
                Ok(text) => {
                    let result = self.validator.validate(task, &text);
                    if result.is_valid {
                        tracing::debug!(
                            service = %self.breaker.service(),
                            task = task.name(),
                            attempt,
                            score = result.score,
                            "Generation accepted"
                        );
                        return GenerationOutcome::Accepted {
                            result,
                            attempts: attempt,
                        };
                    }

                    tracing::info!(
                        service = %self.breaker.service(),
                        task = task.name(),
                        attempt,
                        score = result.score,
                        "Generation rejected by validation"
                    );
                    if best.as_ref().map_or(true, |b| result.score > b.score) {
                        best = Some(result);
                    }
                }
                Err(error) => {
                    last_error = error;
                    if self.breaker.state() == CircuitState::Open {
                        tracing::warn!(
                            service = %self.breaker.service(),
                            attempt,
                            "Circuit open, abandoning generation"
                        );
                        return Self::give_up(best, last_error, attempt);
                    }
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(calculate_backoff(attempt, base, max)).await;
            }
        }

        Self::give_up(best, last_error, max_attempts)
    }

    fn give_up(best: Option<ValidationResult>, error: String, attempts: u32) -> GenerationOutcome {
        match best {
            Some(result) => GenerationOutcome::Rejected { result, attempts },
            None => GenerationOutcome::Unavailable { error, attempts },
        }
    }
}

impl fmt::Debug for GuardedGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedGeneration")
            .field("service", &self.breaker.service())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    const GOOD: &str = r#"{
        "title": "Calibrated retrieval for scientific question answering",
        "research_question": "Does calibration-aware retrieval reduce unsupported answers in scientific QA?",
        "objectives": [
            "Build a benchmark of unanswerable scientific questions",
            "Train a retriever with an explicit calibration loss"
        ],
        "methodology": "We fine-tune a dense retriever with a calibration loss on SciQ and compare it against BM25 and DPR baselines. Answers are scored for support by two annotators with adjudication.",
        "expected_outcomes": ["A 20% reduction in unsupported answers at equal recall"]
    }"#;

    fn pipeline(failure_threshold: u32) -> GuardedGeneration {
        let breaker = CircuitBreaker::new(
            "gemini-api",
            CircuitBreakerConfig::new(failure_threshold, 1, Duration::from_secs(60)),
        )
        .unwrap();
        GuardedGeneration::new(Arc::new(breaker), ResponseValidator::default(), PipelineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_first_good_response() {
        let outcome = pipeline(5)
            .run(&ValidationTask::ResearchProposal, "propose", |_| async {
                Ok::<_, String>(GOOD.to_string())
            })
            .await;

        assert!(outcome.is_accepted());
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerates_after_rejection() {
        let outcome = pipeline(5)
            .run(&ValidationTask::ResearchProposal, "propose", |attempt| async move {
                if attempt == 1 {
                    Ok::<_, String>("no json here".to_string())
                } else {
                    Ok(GOOD.to_string())
                }
            })
            .await;

        assert!(outcome.is_accepted());
        assert_eq!(outcome.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_best_rejected_result() {
        let outcome = pipeline(5)
            .run(&ValidationTask::ResearchProposal, "propose", |attempt| async move {
                if attempt == 2 {
                    Ok::<_, String>(r#"{"title": "Only a title here"}"#.to_string())
                } else {
                    Ok("no json here".to_string())
                }
            })
            .await;

        match outcome {
            GenerationOutcome::Rejected { result, attempts } => {
                assert_eq!(attempts, 3);
                assert!((result.score - 0.75).abs() < 1e-9);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_stops_early() {
        let calls = AtomicU32::new(0);
        let outcome = pipeline(1)
            .run(&ValidationTask::ResearchProposal, "propose", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<String, _>("quota exceeded") }
            })
            .await;

        match outcome {
            GenerationOutcome::Unavailable { error, attempts } => {
                assert_eq!(attempts, 1);
                assert_eq!(error, "quota exceeded");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
