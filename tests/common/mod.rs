//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gap_guard::config::CircuitBreakerConfig;
use gap_guard::resilience::CircuitBreaker;
use serde_json::{json, Value};

/// Counts how many times a guarded operation was actually invoked.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn calls(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn succeed<T>(&self, value: T) -> impl Future<Output = Result<T, String>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    pub fn fail<T>(&self, message: &str) -> impl Future<Output = Result<T, String>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        let message = message.to_string();
        async move { Err(message) }
    }

    /// An operation that never finishes on its own.
    pub fn hang<T>(&self) -> impl Future<Output = Result<T, String>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err("unreachable".to_string())
        }
    }
}

pub fn breaker(failure_threshold: u32, success_threshold: u32, timeout_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(
        "test-service",
        CircuitBreakerConfig::new(failure_threshold, success_threshold, Duration::from_millis(timeout_ms)),
    )
    .unwrap()
}

pub fn gap(problem: &str, gap_type: &str, confidence: f64) -> Value {
    json!({
        "problem": problem,
        "type": gap_type,
        "confidence": confidence,
        "evidence": "The authors note this in their limitations section.",
        "section": "Limitations"
    })
}

/// Paper text the well-formed gaps below are grounded in.
pub const PAPER: &str = "We study transformer scaling laws for language modeling. \
    Our scaling experiments cover English corpora only, and evaluation \
    relies on perplexity. Multilingual transformer scaling remains open.";

pub fn well_formed_gaps() -> Value {
    json!([
        gap("Scaling behaviour of multilingual transformer models is not measured", "data", 0.7),
        gap("Evaluation relies on perplexity without downstream task scaling", "evaluation", 0.6),
    ])
}

pub fn well_formed_proposal() -> Value {
    json!({
        "title": "Multilingual scaling laws for transformer language models",
        "research_question": "Do compute-optimal scaling laws hold for multilingual corpora?",
        "objectives": [
            "Train a model family on a balanced multilingual corpus",
            "Fit scaling exponents per language and compare them"
        ],
        "methodology": "We train eight transformer sizes from 10M to 1B parameters on a balanced 40-language corpus, fit power laws to held-out loss per language, and compare exponents with English-only baselines using bootstrap confidence intervals.",
        "expected_outcomes": ["Per-language scaling exponents with confidence intervals"],
        "timeline": "Six months"
    })
}

pub fn well_formed_red_team() -> Value {
    json!({
        "overall_risk": "medium",
        "summary": "The main risk is that per-language loss is not comparable across scripts.",
        "failure_modes": [{
            "description": "Tokenizer fertility differs by script, skewing loss comparisons",
            "category": "methodological",
            "likelihood": 0.6,
            "impact": "high",
            "mitigation": "Report bits per byte instead of per-token loss and normalize across scripts",
            "affected_parties": ["Low-resource language communities"]
        }]
    })
}
