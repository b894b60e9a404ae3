//! Gap-extraction heuristics.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::validation::grounding::{grounding_ratio, key_terms};
use crate::validation::schema::{check_gaps, ResearchGap};
use crate::validation::scoring::{capped, Scorecard};
use crate::validation::types::{IssueKind, ParsedResponse, Severity, ValidationIssue};

const IMPLAUSIBLE_CONFIDENCE: f64 = 0.95;
const LONG_PROBLEM_CHARS: usize = 300;
const MIN_GROUNDED_RATIO: f64 = 0.8;

/// Per-call inputs for gap validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapValidationOptions {
    /// Full text of the source paper; enables the hallucination check.
    pub paper_content: Option<String>,
    /// Overrides the configured maximum number of gaps.
    pub max_gaps: Option<usize>,
}

impl GapValidationOptions {
    pub fn with_paper(mut self, paper: impl Into<String>) -> Self {
        self.paper_content = Some(paper.into());
        self
    }

    pub fn with_max_gaps(mut self, max_gaps: usize) -> Self {
        self.max_gaps = Some(max_gaps);
        self
    }
}

pub(crate) fn check(
    value: &Value,
    options: &GapValidationOptions,
    config: &ValidatorConfig,
    card: &mut Scorecard,
) -> Option<ParsedResponse> {
    let items = value.as_array()?;
    let conformance = check_gaps(items);

    if !conformance.is_conformant() {
        card.deduct(
            0.25,
            schema_issue("gap", &conformance.violations)
                .with_suggestion("Each gap needs problem (10-500 chars), type and confidence in [0, 1]"),
        );
    }

    let gaps = conformance.value;
    let max_gaps = options.max_gaps.unwrap_or(config.max_gaps);
    check_count(items.len(), max_gaps, card);
    check_confidence(&gaps, card);
    check_lengths(&gaps, card);
    check_duplicates(&gaps, card);
    check_evidence(&gaps, card);

    if let Some(paper) = options.paper_content.as_deref().filter(|p| !p.trim().is_empty()) {
        check_grounding(&gaps, paper, config, card);
    }

    Some(ParsedResponse::Gaps(gaps))
}

/// One issue summarizing schema violations.
pub(crate) fn schema_issue(contract: &str, violations: &[String]) -> ValidationIssue {
    let shown: Vec<&str> = violations.iter().take(3).map(String::as_str).collect();
    let more = violations.len().saturating_sub(shown.len());
    let mut message = format!("Response does not match the {} schema: {}", contract, shown.join("; "));
    if more > 0 {
        message.push_str(&format!(" (and {} more)", more));
    }
    ValidationIssue::new(IssueKind::FormatError, Severity::High, message)
}

fn check_count(count: usize, max_gaps: usize, card: &mut Scorecard) {
    if count == 0 {
        card.deduct(
            0.2,
            ValidationIssue::new(IssueKind::LowConfidence, Severity::Medium, "No research gaps were extracted")
                .with_suggestion("Check that the paper text reached the model"),
        );
    } else if count > max_gaps {
        card.deduct(
            0.1,
            ValidationIssue::new(
                IssueKind::Inconsistency,
                Severity::Low,
                format!("{} gaps extracted, more than the expected maximum of {}", count, max_gaps),
            ),
        );
    }
}

fn check_confidence(gaps: &[ResearchGap], card: &mut Scorecard) {
    let overconfident = gaps.iter().filter(|g| g.confidence > IMPLAUSIBLE_CONFIDENCE).count();
    if overconfident > 0 {
        card.deduct(
            capped(overconfident, 0.05, 0.15),
            ValidationIssue::new(
                IssueKind::LowConfidence,
                Severity::Low,
                format!("{} gap(s) report confidence above {}", overconfident, IMPLAUSIBLE_CONFIDENCE),
            )
            .with_suggestion("Near-certain confidence is rarely justified for an inferred gap"),
        );
    }
}

fn check_lengths(gaps: &[ResearchGap], card: &mut Scorecard) {
    let long = gaps
        .iter()
        .filter(|g| g.problem.chars().count() > LONG_PROBLEM_CHARS)
        .count();
    if long > 0 {
        card.deduct(
            capped(long, 0.05, 0.1),
            ValidationIssue::new(
                IssueKind::FormatError,
                Severity::Low,
                format!("{} problem statement(s) exceed {} characters", long, LONG_PROBLEM_CHARS),
            )
            .with_suggestion("State each gap in one or two sentences"),
        );
    }
}

fn check_duplicates(gaps: &[ResearchGap], card: &mut Scorecard) {
    let mut seen = HashSet::new();
    let duplicates = gaps
        .iter()
        .filter(|g| !seen.insert(g.problem.trim().to_lowercase()))
        .count();
    if duplicates > 0 {
        card.deduct(
            0.1,
            ValidationIssue::new(
                IssueKind::Inconsistency,
                Severity::Medium,
                format!("{} duplicated problem statement(s)", duplicates),
            ),
        );
    }
}

fn check_evidence(gaps: &[ResearchGap], card: &mut Scorecard) {
    let missing = gaps
        .iter()
        .filter(|g| g.evidence.as_deref().map_or(true, |e| e.trim().is_empty()))
        .count();
    if missing * 2 > gaps.len() {
        card.deduct(
            0.05,
            ValidationIssue::new(
                IssueKind::LowConfidence,
                Severity::Low,
                format!("{} of {} gaps cite no supporting evidence", missing, gaps.len()),
            )
            .with_suggestion("Ask for a supporting passage with each gap"),
        );
    }
}

fn check_grounding(gaps: &[ResearchGap], paper: &str, config: &ValidatorConfig, card: &mut Scorecard) {
    let terms = key_terms(paper, config.key_terms, config.key_term_min_len);
    let ratio = grounding_ratio(gaps.iter().map(|g| g.problem.as_str()), paper, &terms);

    if ratio < 1.0 {
        card.penalize(1.0 - ratio);
    }
    if ratio < MIN_GROUNDED_RATIO {
        card.note(
            ValidationIssue::new(
                IssueKind::Hallucination,
                Severity::Medium,
                format!("Only {:.0}% of gaps are grounded in the paper text", ratio * 100.0),
            )
            .with_suggestion("Discard gaps that share no terminology with the source"),
        );
    }
    tracing::debug!(ratio, key_terms = terms.len(), "Grounding checked");
}
