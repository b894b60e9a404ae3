//! Research-proposal heuristics.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::validation::gaps::schema_issue;
use crate::validation::schema::{check_proposal, ResearchProposal};
use crate::validation::scoring::Scorecard;
use crate::validation::types::{IssueKind, ParsedResponse, Severity, ValidationIssue};

lazy_static! {
    /// Hedging words that undercut statements meant to be definitive.
    pub(crate) static ref TENTATIVE: Regex =
        Regex::new(r"(?i)\b(might|could|may|possibly|perhaps)\b").expect("static pattern");
}

const SHORT_METHODOLOGY_CHARS: usize = 150;
const LONG_TITLE_CHARS: usize = 150;

pub(crate) fn check(value: &Value, card: &mut Scorecard) -> Option<ParsedResponse> {
    let conformance = check_proposal(value);

    if !conformance.is_conformant() {
        card.deduct(
            0.25,
            schema_issue("proposal", &conformance.violations)
                .with_suggestion("A proposal needs title, research_question, objectives and methodology"),
        );
    }

    // Nothing typed means the top-level fields themselves are unusable.
    let Some(proposal) = conformance.value else {
        card.reject();
        return None;
    };
    check_objectives(&proposal, card);
    check_methodology(&proposal, card);
    check_outcomes(&proposal, card);
    check_title(&proposal, card);

    Some(ParsedResponse::Proposal(proposal))
}

fn check_objectives(proposal: &ResearchProposal, card: &mut Scorecard) {
    if proposal.objectives.len() < 2 {
        card.deduct(
            0.05,
            ValidationIssue::new(IssueKind::LowConfidence, Severity::Low, "Proposal lists fewer than two objectives"),
        );
    }

    let hedged = proposal
        .objectives
        .iter()
        .chain(&proposal.expected_outcomes)
        .filter(|s| TENTATIVE.is_match(s))
        .count();
    if hedged > 0 {
        card.deduct(
            0.05,
            ValidationIssue::new(
                IssueKind::LowConfidence,
                Severity::Low,
                format!("{} objective(s) or outcome(s) use tentative language", hedged),
            )
            .with_suggestion("Objectives should state what will be done, not what might happen"),
        );
    }
}

fn check_methodology(proposal: &ResearchProposal, card: &mut Scorecard) {
    let len = proposal.methodology.chars().count();
    if len < SHORT_METHODOLOGY_CHARS {
        card.deduct(
            0.1,
            ValidationIssue::new(
                IssueKind::LowConfidence,
                Severity::Medium,
                format!("Methodology is only {} characters", len),
            )
            .with_suggestion("Describe data, baselines and evaluation"),
        );
    }
}

fn check_outcomes(proposal: &ResearchProposal, card: &mut Scorecard) {
    if proposal.expected_outcomes.is_empty() {
        card.deduct(
            0.05,
            ValidationIssue::new(IssueKind::Inconsistency, Severity::Low, "Proposal states no expected outcomes"),
        );
    }
}

fn check_title(proposal: &ResearchProposal, card: &mut Scorecard) {
    let len = proposal.title.chars().count();
    if len > LONG_TITLE_CHARS {
        card.deduct(
            0.05,
            ValidationIssue::new(IssueKind::FormatError, Severity::Low, format!("Title is {} characters long", len)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proposal() -> Value {
        json!({
            "title": "Calibrated retrieval for scientific question answering",
            "research_question": "Does calibration-aware retrieval reduce unsupported answers in scientific QA?",
            "objectives": [
                "Build a benchmark of unanswerable scientific questions",
                "Train a retriever with an explicit calibration loss"
            ],
            "methodology": "We fine-tune a dense retriever with a calibration loss on SciQ and compare it against BM25 and DPR baselines. Answers are scored for support by two annotators with adjudication.",
            "expected_outcomes": ["A 20% reduction in unsupported answers at equal recall"]
        })
    }

    fn run(value: Value) -> (f64, Vec<ValidationIssue>) {
        let mut card = Scorecard::start();
        check(&value, &mut card);
        let result = card.finish("", "m", None);
        (result.score, result.issues)
    }

    #[test]
    fn test_clean_proposal() {
        let (score, issues) = run(proposal());
        assert_eq!(score, 1.0);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_tentative_objectives() {
        let mut value = proposal();
        value["objectives"][1] = json!("We might train a retriever with a calibration loss");
        let (score, issues) = run(value);

        assert!((score - 0.95).abs() < 1e-9);
        assert_eq!(issues[0].kind, IssueKind::LowConfidence);
    }

    #[test]
    fn test_thin_proposal() {
        let mut value = proposal();
        value["objectives"] = json!(["Build a benchmark of unanswerable questions"]);
        value["methodology"] = json!("We fine-tune a retriever and compare it against two standard baselines.");
        value.as_object_mut().unwrap().remove("expected_outcomes");
        let (score, issues) = run(value);

        assert!((score - 0.8).abs() < 1e-9);
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_untyped_proposal_stops_after_schema() {
        let (score, issues) = run(json!({"title": "Only a title here"}));
        assert!((score - 0.75).abs() < 1e-9);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_untyped_proposal_is_never_valid() {
        let mut card = Scorecard::start();
        let parsed = check(&json!({"title": "Only a title here"}), &mut card);
        assert!(parsed.is_none());
        assert!(!card.finish("", "m", None).is_valid);
    }
}
