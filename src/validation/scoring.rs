//! Deductive scoring shared by every task validator.

use std::time::Instant;

use crate::validation::types::{
    ParsedResponse, ValidationIssue, ValidationMetadata, ValidationResult, ACCEPT_THRESHOLD,
};

/// Accumulates deductions and issues for one response.
///
/// Issues are only appended and the score only goes down.
#[derive(Debug)]
pub struct Scorecard {
    score: f64,
    issues: Vec<ValidationIssue>,
    fatal: bool,
    started: Instant,
}

impl Scorecard {
    pub fn start() -> Self {
        Self {
            score: 1.0,
            issues: Vec::new(),
            fatal: false,
            started: Instant::now(),
        }
    }

    pub fn deduct(&mut self, amount: f64, issue: ValidationIssue) {
        self.score -= amount.max(0.0);
        self.issues.push(issue);
    }

    /// Subtract without recording an issue of its own.
    pub fn penalize(&mut self, amount: f64) {
        self.score -= amount.max(0.0);
    }

    pub fn note(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Mark the response as unusable regardless of score.
    pub fn reject(&mut self) {
        self.fatal = true;
    }

    /// Unrecoverable failure: score drops to zero.
    pub fn fail(&mut self, issue: ValidationIssue) {
        self.score = 0.0;
        self.fatal = true;
        self.issues.push(issue);
    }

    pub fn score(&self) -> f64 {
        self.score.clamp(0.0, 1.0)
    }

    pub fn finish(self, response: &str, model: &str, parsed: Option<ParsedResponse>) -> ValidationResult {
        let score = self.score();
        let length = response.len();

        ValidationResult {
            is_valid: !self.fatal && score > ACCEPT_THRESHOLD,
            score,
            issues: self.issues,
            metadata: ValidationMetadata {
                response_length: length,
                token_count: length.div_ceil(4),
                processing_time_ms: self.started.elapsed().as_secs_f64() * 1000.0,
                model: model.to_string(),
            },
            parsed,
        }
    }
}

/// Total deduction for `count` occurrences at `each`, capped at `cap`.
pub fn capped(count: usize, each: f64, cap: f64) -> f64 {
    (count as f64 * each).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::types::{IssueKind, Severity};

    #[test]
    fn test_score_is_clamped() {
        let mut card = Scorecard::start();
        card.deduct(0.8, ValidationIssue::new(IssueKind::Hallucination, Severity::Medium, "a"));
        card.deduct(0.8, ValidationIssue::new(IssueKind::Inconsistency, Severity::Low, "b"));

        let result = card.finish("[]", "test-model", None);
        assert_eq!(result.score, 0.0);
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn test_metadata() {
        let result = Scorecard::start().finish("12345", "gemini-1.5-flash", None);
        assert_eq!(result.metadata.response_length, 5);
        assert_eq!(result.metadata.token_count, 2);
        assert_eq!(result.metadata.model, "gemini-1.5-flash");
        assert!(result.is_valid);
    }

    #[test]
    fn test_rejected_card_is_invalid_even_with_high_score() {
        let mut card = Scorecard::start();
        card.reject();
        assert!(!card.finish("", "m", None).is_valid);
    }

    #[test]
    fn test_capped() {
        assert_eq!(capped(2, 0.05, 0.15), 0.1);
        assert_eq!(capped(10, 0.05, 0.15), 0.15);
    }
}
