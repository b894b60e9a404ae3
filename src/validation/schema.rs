//! Response contracts for each LLM task.
//!
//! Types and enum membership are enforced by serde; length and range bounds
//! by `validator`. Conformance checks never fail outright: they return
//! whatever could be typed together with every violation found, so later
//! heuristics still have something to look at.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapType {
    Data,
    Methodology,
    Theory,
    Application,
    Evaluation,
    Reproducibility,
}

/// One research gap extracted from a paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResearchGap {
    #[validate(length(min = 10, max = 500))]
    pub problem: String,

    #[serde(rename = "type")]
    pub gap_type: GapType,

    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    /// Passage of the paper supporting the gap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub evidence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub suggested_direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResearchProposal {
    #[validate(length(min = 10, max = 200))]
    pub title: String,

    #[validate(length(min = 20, max = 500))]
    pub research_question: String,

    #[validate(length(min = 1, max = 8))]
    pub objectives: Vec<String>,

    #[validate(length(min = 50, max = 3000))]
    pub methodology: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_outcomes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Methodological,
    Data,
    Ethical,
    Technical,
    Reproducibility,
}

/// One way a proposal could fail, as argued by the red team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FailureMode {
    #[validate(length(min = 10, max = 1000))]
    pub description: String,

    pub category: FailureCategory,

    #[validate(range(min = 0.0, max = 1.0))]
    pub likelihood: f64,

    pub impact: RiskLevel,

    #[validate(length(min = 10, max = 1000))]
    pub mitigation: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_parties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RedTeamAnalysis {
    pub overall_risk: RiskLevel,

    #[validate(length(min = 20, max = 2000))]
    pub summary: String,

    #[validate(length(min = 1, max = 20))]
    pub failure_modes: Vec<FailureMode>,
}

/// What could be typed from a response, plus every schema violation.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformance<T> {
    pub value: T,
    pub violations: Vec<String>,
}

impl<T> Conformance<T> {
    pub fn is_conformant(&self) -> bool {
        self.violations.is_empty()
    }

    /// Strict view: the value only if nothing was violated.
    pub fn into_result(self) -> Result<T, Vec<String>> {
        if self.violations.is_empty() {
            Ok(self.value)
        } else {
            Err(self.violations)
        }
    }
}

/// Check every element of a gap array. Elements that fail to deserialize
/// are left out of the typed list.
pub fn check_gaps(items: &[Value]) -> Conformance<Vec<ResearchGap>> {
    let mut gaps = Vec::with_capacity(items.len());
    let mut violations = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let path = format!("gaps[{}]", i);
        if let Some(gap) = typed::<ResearchGap>(item, &path, &mut violations) {
            gaps.push(gap);
        }
    }

    Conformance { value: gaps, violations }
}

/// Top-level proposal fields. Lists stay untyped so one bad entry does not
/// sink the whole proposal.
#[derive(Deserialize)]
struct RawProposal {
    title: String,
    research_question: String,
    #[serde(default)]
    objectives: Vec<Value>,
    methodology: String,
    #[serde(default)]
    expected_outcomes: Vec<Value>,
    #[serde(default)]
    timeline: Option<Value>,
}

/// Check a proposal. Only a missing or mistyped `title`,
/// `research_question` or `methodology` leaves nothing typed.
pub fn check_proposal(value: &Value) -> Conformance<Option<ResearchProposal>> {
    let mut violations = Vec::new();
    let raw = match RawProposal::deserialize(value) {
        Ok(raw) => raw,
        Err(e) => {
            violations.push(format!("proposal: {}", e));
            return Conformance { value: None, violations };
        }
    };

    let timeline = match raw.timeline {
        None | Some(Value::Null) => None,
        Some(Value::String(timeline)) => Some(timeline),
        Some(_) => {
            violations.push("proposal.timeline: expected a string".to_string());
            None
        }
    };
    let proposal = ResearchProposal {
        title: raw.title,
        research_question: raw.research_question,
        objectives: strings(&raw.objectives, "proposal.objectives", &mut violations),
        methodology: raw.methodology,
        expected_outcomes: strings(&raw.expected_outcomes, "proposal.expected_outcomes", &mut violations),
        timeline,
    };

    if let Err(errors) = proposal.validate() {
        describe(&errors, "proposal", &mut violations);
    }
    check_items("proposal.objectives", &proposal.objectives, 10, 300, &mut violations);
    check_items("proposal.expected_outcomes", &proposal.expected_outcomes, 10, 500, &mut violations);

    Conformance { value: Some(proposal), violations }
}

/// Top-level red-team fields with failure modes left untyped.
#[derive(Deserialize)]
struct RawRedTeam {
    overall_risk: RiskLevel,
    summary: String,
    #[serde(default)]
    failure_modes: Vec<Value>,
}

/// Check a red-team analysis. Failure modes are typed one by one, like gaps;
/// only a missing or mistyped `overall_risk` or `summary` leaves nothing typed.
pub fn check_red_team(value: &Value) -> Conformance<Option<RedTeamAnalysis>> {
    let mut violations = Vec::new();
    let raw = match RawRedTeam::deserialize(value) {
        Ok(raw) => raw,
        Err(e) => {
            violations.push(format!("analysis: {}", e));
            return Conformance { value: None, violations };
        }
    };

    let failure_modes = raw
        .failure_modes
        .iter()
        .enumerate()
        .filter_map(|(i, mode)| {
            typed::<FailureMode>(mode, &format!("analysis.failure_modes[{}]", i), &mut violations)
        })
        .collect();
    let analysis = RedTeamAnalysis {
        overall_risk: raw.overall_risk,
        summary: raw.summary,
        failure_modes,
    };

    // Modes were validated above; this covers summary and the mode count.
    if let Err(errors) = analysis.validate() {
        describe(&errors, "analysis", &mut violations);
    }

    Conformance { value: Some(analysis), violations }
}

fn typed<T>(value: &Value, path: &str, violations: &mut Vec<String>) -> Option<T>
where
    T: DeserializeOwned + Validate,
{
    match T::deserialize(value) {
        Ok(typed) => {
            if let Err(errors) = typed.validate() {
                describe(&errors, path, violations);
            }
            Some(typed)
        }
        Err(e) => {
            violations.push(format!("{}: {}", path, e));
            None
        }
    }
}

fn describe(errors: &ValidationErrors, path: &str, violations: &mut Vec<String>) {
    let mut found = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            found.push(format!(
                "{}.{}: {} {}",
                path,
                field,
                error.code,
                Bounds(error.params.get("min"), error.params.get("max"))
            ));
        }
    }
    // field_errors() is a HashMap
    found.sort();
    violations.extend(found);
}

fn strings(items: &[Value], path: &str, violations: &mut Vec<String>) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::String(s) => Some(s.clone()),
            _ => {
                violations.push(format!("{}[{}]: expected a string", path, i));
                None
            }
        })
        .collect()
}

fn check_items(path: &str, items: &[String], min: usize, max: usize, violations: &mut Vec<String>) {
    for (i, item) in items.iter().enumerate() {
        let len = item.chars().count();
        if len < min || len > max {
            violations.push(format!(
                "{}[{}]: length must be between {} and {} (got {})",
                path, i, min, max, len
            ));
        }
    }
}

struct Bounds<'a>(Option<&'a Value>, Option<&'a Value>);

impl fmt::Display for Bounds<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0, self.1) {
            (Some(min), Some(max)) => write!(f, "must be between {} and {}", min, max),
            (Some(min), None) => write!(f, "must be at least {}", min),
            (None, Some(max)) => write!(f, "must be at most {}", max),
            (None, None) => write!(f, "is invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_problem_violates_length() {
        let items = vec![json!({"problem": "short", "type": "data", "confidence": 0.5})];
        let checked = check_gaps(&items);

        assert_eq!(checked.value.len(), 1);
        assert_eq!(checked.violations, vec!["gaps[0].problem: length must be between 10 and 500"]);
    }

    #[test]
    fn test_unknown_gap_type_is_untyped() {
        let items = vec![
            json!({"problem": "No benchmark covers low-resource languages", "type": "vibes", "confidence": 0.5}),
            json!({"problem": "Evaluation ignores calibration error", "type": "evaluation", "confidence": 0.6}),
        ];
        let checked = check_gaps(&items);

        assert_eq!(checked.value.len(), 1);
        assert_eq!(checked.value[0].gap_type, GapType::Evaluation);
        assert!(checked.violations[0].starts_with("gaps[0]: unknown variant `vibes`"));
    }

    #[test]
    fn test_confidence_range() {
        let items = vec![json!({"problem": "Evaluation ignores calibration error", "type": "evaluation", "confidence": 1.4})];
        let checked = check_gaps(&items);
        assert_eq!(checked.violations, vec!["gaps[0].confidence: range must be between 0.0 and 1.0"]);
    }

    #[test]
    fn test_proposal_item_lengths() {
        let value = json!({
            "title": "Calibrated retrieval for scientific QA",
            "research_question": "Does calibration-aware retrieval reduce unsupported answers?",
            "objectives": ["Too short", "Build a benchmark of unanswerable questions"],
            "methodology": "We fine-tune a retriever with a calibration loss and compare against BM25 and DPR baselines."
        });
        let checked = check_proposal(&value);

        assert!(checked.value.is_some());
        assert_eq!(checked.violations.len(), 1);
        assert!(checked.violations[0].starts_with("proposal.objectives[0]"));
    }

    #[test]
    fn test_red_team_nested_modes() {
        let value = json!({
            "overall_risk": "medium",
            "summary": "The main risks concern data leakage between splits.",
            "failure_modes": [{
                "description": "Test questions overlap with the pre-training corpus",
                "category": "data",
                "likelihood": 0.4,
                "impact": "high",
                "mitigation": "n/a"
            }]
        });
        let checked = check_red_team(&value);

        assert_eq!(
            checked.violations,
            vec!["analysis.failure_modes[0].mitigation: length must be between 10 and 1000"]
        );
        assert!(checked.into_result().is_err());
    }

    #[test]
    fn test_bad_failure_mode_leaves_the_rest_typed() {
        let mode = |category: &str| {
            json!({
                "description": "Test questions overlap with the pre-training corpus",
                "category": category,
                "likelihood": 0.4,
                "impact": "high",
                "mitigation": "Deduplicate test questions against the corpus"
            })
        };
        let value = json!({
            "overall_risk": "medium",
            "summary": "The main risks concern data leakage between splits.",
            "failure_modes": [mode("data"), mode("legal"), mode("technical")]
        });
        let checked = check_red_team(&value);

        let analysis = checked.value.as_ref().unwrap();
        assert_eq!(analysis.failure_modes.len(), 2);
        assert_eq!(checked.violations.len(), 1);
        assert!(checked.violations[0].starts_with("analysis.failure_modes[1]: unknown variant `legal`"));
    }

    #[test]
    fn test_non_string_objective_is_dropped() {
        let value = json!({
            "title": "Calibrated retrieval for scientific QA",
            "research_question": "Does calibration-aware retrieval reduce unsupported answers?",
            "objectives": [42, "Build a benchmark of unanswerable questions"],
            "methodology": "We fine-tune a retriever with a calibration loss and compare against BM25 and DPR baselines."
        });
        let checked = check_proposal(&value);

        assert_eq!(checked.value.unwrap().objectives.len(), 1);
        assert_eq!(checked.violations, vec!["proposal.objectives[0]: expected a string"]);
    }

    #[test]
    fn test_missing_field() {
        let checked = check_red_team(&json!({"overall_risk": "low"}));
        assert!(checked.value.is_none());
        assert!(checked.violations[0].contains("missing field"));
    }

    #[test]
    fn test_risk_rank() {
        assert!(RiskLevel::Critical.rank() - RiskLevel::Medium.rank() == 2);
    }
}
