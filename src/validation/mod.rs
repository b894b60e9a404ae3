//! Response validation subsystem.
//!
//! # Data Flow
//! ```text
//! LLM text (from CircuitBreaker::execute)
//!     → validator.rs (task dispatch, shared steps)
//!     → extract.rs / schema.rs (structure)
//!     → gaps.rs / proposal.rs / red_team.rs (task heuristics)
//!     → grounding.rs (hallucination check)
//!     → scoring.rs (deductions, verdict, metadata)
//!
//! toxicity.rs runs on its own and does not touch the score.
//! ```
//!
//! # Design Decisions
//! - Validation never fails; problems are issues with score deductions
//! - Typed schemas per task, bounds checked with `validator`
//! - A response is accepted only when its score exceeds 0.7

pub mod extract;
pub mod gaps;
pub mod grounding;
pub mod proposal;
pub mod red_team;
pub mod schema;
pub mod scoring;
pub mod toxicity;
pub mod types;
pub mod validator;

pub use gaps::GapValidationOptions;
pub use schema::{FailureCategory, FailureMode, GapType, RedTeamAnalysis, ResearchGap, ResearchProposal, RiskLevel};
pub use toxicity::{detect_toxicity, ToxicityCategory, ToxicityReport, ToxicitySeverity};
pub use types::{
    IssueKind, ParsedResponse, Severity, Span, ValidationIssue, ValidationMetadata, ValidationResult,
    ACCEPT_THRESHOLD,
};
pub use validator::{
    validate_gap_extraction, validate_red_team_analysis, validate_research_proposal, ResponseValidator,
    ValidationTask,
};
