//! Red-team analysis heuristics.

use serde_json::Value;

use crate::validation::gaps::schema_issue;
use crate::validation::schema::{check_red_team, FailureCategory, RedTeamAnalysis};
use crate::validation::scoring::{capped, Scorecard};
use crate::validation::types::{IssueKind, ParsedResponse, Severity, ValidationIssue};

const IMPLAUSIBLE_LIKELIHOOD: f64 = 0.95;

pub(crate) fn check(value: &Value, card: &mut Scorecard) -> Option<ParsedResponse> {
    let conformance = check_red_team(value);

    if !conformance.is_conformant() {
        card.deduct(
            0.25,
            schema_issue("red-team", &conformance.violations)
                .with_suggestion("Each failure mode needs description, category, likelihood, impact and mitigation"),
        );
    }

    // Nothing typed means the top-level fields themselves are unusable.
    let Some(analysis) = conformance.value else {
        card.reject();
        return None;
    };
    check_mitigations(&analysis, card);
    check_affected_parties(&analysis, card);
    check_likelihood(&analysis, card);
    check_overall_risk(&analysis, card);

    Some(ParsedResponse::RedTeam(analysis))
}

fn check_mitigations(analysis: &RedTeamAnalysis, card: &mut Scorecard) {
    let thin = analysis
        .failure_modes
        .iter()
        .filter(|m| m.mitigation.chars().count() < m.description.chars().count())
        .count();
    if thin > 0 {
        card.deduct(
            capped(thin, 0.03, 0.15),
            ValidationIssue::new(
                IssueKind::Inconsistency,
                Severity::Low,
                format!("{} mitigation(s) are shorter than the failure they address", thin),
            )
            .with_suggestion("Mitigations should be at least as specific as the risk"),
        );
    }
}

fn check_affected_parties(analysis: &RedTeamAnalysis, card: &mut Scorecard) {
    let missing = analysis
        .failure_modes
        .iter()
        .filter(|m| m.category == FailureCategory::Ethical && m.affected_parties.is_empty())
        .count();
    if missing > 0 {
        card.deduct(
            capped(missing, 0.05, 0.1),
            ValidationIssue::new(
                IssueKind::Inconsistency,
                Severity::Low,
                format!("{} ethical failure mode(s) name no affected parties", missing),
            ),
        );
    }
}

fn check_likelihood(analysis: &RedTeamAnalysis, card: &mut Scorecard) {
    let certain = analysis
        .failure_modes
        .iter()
        .filter(|m| m.likelihood > IMPLAUSIBLE_LIKELIHOOD)
        .count();
    if certain > 0 {
        card.deduct(
            0.05,
            ValidationIssue::new(
                IssueKind::LowConfidence,
                Severity::Low,
                format!("{} failure mode(s) are rated near-certain", certain),
            ),
        );
    }
}

fn check_overall_risk(analysis: &RedTeamAnalysis, card: &mut Scorecard) {
    let Some(worst) = analysis.failure_modes.iter().map(|m| m.impact).max() else {
        return;
    };
    if worst.rank() >= analysis.overall_risk.rank() + 2 {
        card.deduct(
            0.1,
            ValidationIssue::new(
                IssueKind::Inconsistency,
                Severity::Medium,
                format!(
                    "Overall risk {:?} understates a failure mode with {:?} impact",
                    analysis.overall_risk, worst
                ),
            ),
        );
    }
}
