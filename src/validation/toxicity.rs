//! Sensitive-topic scan.
//!
//! A standalone signal for callers: it never feeds into the validation
//! score. Severity is `high` only when more than two categories match.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::observability::metrics;
use crate::validation::types::{IssueKind, Severity, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToxicityCategory {
    HateSpeech,
    Violence,
    Terrorism,
    Harassment,
    Discrimination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToxicitySeverity {
    None,
    Low,
    High,
}

impl ToxicitySeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            ToxicitySeverity::None => "none",
            ToxicitySeverity::Low => "low",
            ToxicitySeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToxicityReport {
    pub detected: bool,
    pub severity: ToxicitySeverity,
    /// Matched categories, in scan order.
    pub categories: Vec<ToxicityCategory>,
}

impl ToxicityReport {
    /// Express the report as a validation issue for callers that collect them.
    pub fn to_issue(&self) -> Option<ValidationIssue> {
        let severity = match self.severity {
            ToxicitySeverity::None => return None,
            ToxicitySeverity::Low => Severity::Medium,
            ToxicitySeverity::High => Severity::High,
        };
        Some(
            ValidationIssue::new(
                IssueKind::Toxicity,
                severity,
                format!("Sensitive content detected: {:?}", self.categories),
            )
            .with_suggestion("Review before showing to users"),
        )
    }
}

lazy_static! {
    static ref PATTERNS: Vec<(ToxicityCategory, Regex)> = vec![
        (
            ToxicityCategory::HateSpeech,
            Regex::new(r"(?i)\b(hate\s+speech|racial\s+slurs?|white\s+supremac\w*|ethnic\s+cleansing)\b")
                .expect("static pattern"),
        ),
        (
            ToxicityCategory::Violence,
            Regex::new(r"(?i)\b(kill(s|ed|ing)?|murder\w*|massacre\w*|tortur\w*|mutilat\w*)\b")
                .expect("static pattern"),
        ),
        (
            ToxicityCategory::Terrorism,
            Regex::new(r"(?i)\b(terroris\w*|bomb[- ]?making|jihadis\w*|violent\s+extremis\w*)\b")
                .expect("static pattern"),
        ),
        (
            ToxicityCategory::Harassment,
            Regex::new(r"(?i)\b(harass\w*|bully\w*|stalk(s|ed|ing|er)?|doxx\w*|intimidat\w*)\b")
                .expect("static pattern"),
        ),
        (
            ToxicityCategory::Discrimination,
            Regex::new(r"(?i)\b(discriminat\w*|segregat\w*|xenophob\w*|misogyn\w*|inferior\s+races?)\b")
                .expect("static pattern"),
        ),
    ];
}

/// Scan text for sensitive topics.
pub fn detect_toxicity(text: &str) -> ToxicityReport {
    let categories: Vec<ToxicityCategory> = PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(category, _)| *category)
        .collect();

    let severity = match categories.len() {
        0 => ToxicitySeverity::None,
        1 | 2 => ToxicitySeverity::Low,
        _ => ToxicitySeverity::High,
    };

    if severity != ToxicitySeverity::None {
        tracing::debug!(?categories, severity = severity.as_str(), "Sensitive content detected");
        metrics::record_toxicity(severity.as_str());
    }

    ToxicityReport {
        detected: !categories.is_empty(),
        severity,
        categories,
    }
}
