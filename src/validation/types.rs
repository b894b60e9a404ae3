//! Validation result types.

use std::fmt;

use serde::Serialize;

use crate::validation::schema::{RedTeamAnalysis, ResearchGap, ResearchProposal};

/// Score a response must exceed to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.7;

/// What kind of problem an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Hallucination,
    Inconsistency,
    FormatError,
    LowConfidence,
    Toxicity,
    OutOfScope,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::Hallucination => "hallucination",
            IssueKind::Inconsistency => "inconsistency",
            IssueKind::FormatError => "format_error",
            IssueKind::LowConfidence => "low_confidence",
            IssueKind::Toxicity => "toxicity",
            IssueKind::OutOfScope => "out_of_scope",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Byte range within the raw response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMetadata {
    /// Length of the raw response in bytes.
    pub response_length: usize,
    /// Rough token estimate, `ceil(response_length / 4)`.
    pub token_count: usize,
    pub processing_time_ms: f64,
    pub model: String,
}

/// Typed payload of a response that parsed into its task schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", content = "data", rename_all = "kebab-case")]
pub enum ParsedResponse {
    Gaps(Vec<ResearchGap>),
    Proposal(ResearchProposal),
    RedTeam(RedTeamAnalysis),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Quality score in `[0, 1]`.
    pub score: f64,
    pub issues: Vec<ValidationIssue>,
    pub metadata: ValidationMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedResponse>,
}

impl ValidationResult {
    /// Highest severity among the issues, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// True when any issue is high or critical.
    pub fn has_blocking_issues(&self) -> bool {
        self.max_severity() >= Some(Severity::High)
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}
