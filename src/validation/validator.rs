//! Entry points for validating LLM responses.
//!
//! # Steps (shared by every task)
//! ```text
//! raw text
//!     → extract.rs (first balanced JSON, tolerant of surrounding prose)
//!     → serde_json parse            (failure: critical, score 0)
//!     → shape check                 (failure: high, -0.3, stop)
//!     → schema.rs conformance       (failure: high, -0.25, continue)
//!     → task heuristics             (low/medium, small deductions)
//!     → grounding.rs                (gap extraction with paper text only)
//!     → ValidationResult
//! ```

use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::observability::metrics;
use crate::validation::extract::{extract_json, Shape};
use crate::validation::gaps::{self, GapValidationOptions};
use crate::validation::scoring::Scorecard;
use crate::validation::types::{IssueKind, ParsedResponse, Severity, ValidationIssue, ValidationResult};
use crate::validation::{proposal, red_team};

/// Which response contract to validate against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationTask {
    GapExtraction(GapValidationOptions),
    ResearchProposal,
    RedTeamAnalysis,
}

impl ValidationTask {
    pub fn name(&self) -> &'static str {
        match self {
            ValidationTask::GapExtraction(_) => "gap-extraction",
            ValidationTask::ResearchProposal => "research-proposal",
            ValidationTask::RedTeamAnalysis => "red-team-analysis",
        }
    }

    fn shape(&self) -> Shape {
        match self {
            ValidationTask::GapExtraction(_) => Shape::Array,
            ValidationTask::ResearchProposal | ValidationTask::RedTeamAnalysis => Shape::Object,
        }
    }
}

/// Scores LLM responses. Never panics and never returns an error: every
/// problem becomes an issue and a deduction.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    config: ValidatorConfig,
}

impl ResponseValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate(&self, task: &ValidationTask, response: &str) -> ValidationResult {
        let mut card = Scorecard::start();
        let parsed = self.evaluate(task, response, &mut card);
        let result = card.finish(response, &self.config.model, parsed);

        tracing::debug!(
            task = task.name(),
            score = result.score,
            valid = result.is_valid,
            issues = result.issues.len(),
            "Response validated"
        );
        metrics::record_validation(task.name(), result.score, result.is_valid);
        result
    }

    pub fn validate_gap_extraction(&self, response: &str, options: &GapValidationOptions) -> ValidationResult {
        self.validate(&ValidationTask::GapExtraction(options.clone()), response)
    }

    pub fn validate_research_proposal(&self, response: &str) -> ValidationResult {
        self.validate(&ValidationTask::ResearchProposal, response)
    }

    pub fn validate_red_team_analysis(&self, response: &str) -> ValidationResult {
        self.validate(&ValidationTask::RedTeamAnalysis, response)
    }

    fn evaluate(&self, task: &ValidationTask, response: &str, card: &mut Scorecard) -> Option<ParsedResponse> {
        let expected = task.shape();

        let Some(extracted) = extract_json(response, expected) else {
            card.deduct(
                0.3,
                ValidationIssue::new(
                    IssueKind::FormatError,
                    Severity::High,
                    format!("No JSON {} found in response", expected.name()),
                )
                .with_suggestion("Ask the model to answer with JSON only"),
            );
            card.reject();
            return None;
        };

        let value: Value = match serde_json::from_str(extracted.json) {
            Ok(value) => value,
            Err(e) => {
                card.fail(
                    ValidationIssue::new(
                        IssueKind::FormatError,
                        Severity::Critical,
                        format!("Response JSON could not be parsed: {}", e),
                    )
                    .at(extracted.span),
                );
                return None;
            }
        };

        if Shape::of(&value) != Some(expected) {
            card.deduct(
                0.3,
                ValidationIssue::new(
                    IssueKind::FormatError,
                    Severity::High,
                    format!("Expected a JSON {} at the top level", expected.name()),
                )
                .at(extracted.span),
            );
            card.reject();
            return None;
        }

        match task {
            ValidationTask::GapExtraction(options) => gaps::check(&value, options, &self.config, card),
            ValidationTask::ResearchProposal => proposal::check(&value, card),
            ValidationTask::RedTeamAnalysis => red_team::check(&value, card),
        }
    }
}

/// Validate a gap-extraction response with default settings.
pub fn validate_gap_extraction(response: &str, options: &GapValidationOptions) -> ValidationResult {
    ResponseValidator::default().validate_gap_extraction(response, options)
}

/// Validate a research-proposal response with default settings.
pub fn validate_research_proposal(response: &str) -> ValidationResult {
    ResponseValidator::default().validate_research_proposal(response)
}

/// Validate a red-team-analysis response with default settings.
pub fn validate_red_team_analysis(response: &str) -> ValidationResult {
    ResponseValidator::default().validate_red_team_analysis(response)
}
