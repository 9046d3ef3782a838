//! Governance evaluator.
//!
//! Scores section completeness against the checklist for a proposal's
//! template and decides whether governance blocks release. Pure: the caller
//! supplies the latest gate status and override flag.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::policy::{
    SectionChecklist, BLOCK_REASON_COMPOUND, BLOCK_REASON_MANDATORY, BLOCK_REASON_RISK_GATE,
    DEFAULT_COMPOUND_OPTIONAL_THRESHOLD, DEFAULT_PASS_THRESHOLD, PROPOSAL_CHECKLIST,
    SECTION_CHECKLISTS,
};
use crate::sections::{has_content, resolve_sections};
use crate::types::{Finding, FindingCategory, GateStatus, Severity};

/// Thresholds for the governance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceThresholds {
    /// Scores below this are blocked
    pub pass_threshold: u32,
    /// Missing optional sections that compound an already failing score
    pub compound_optional_threshold: usize,
}

impl Default for GovernanceThresholds {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            compound_optional_threshold: DEFAULT_COMPOUND_OPTIONAL_THRESHOLD,
        }
    }
}

/// Inputs of one governance evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GovernanceInput<'a> {
    pub template_key: Option<&'a str>,
    pub sections: Option<&'a serde_json::Value>,
    pub content: Option<&'a str>,
    /// Latest Risk Gate decision for the proposal, if any
    pub risk_gate_status: Option<GateStatus>,
    pub risk_gate_overridden: bool,
}

/// Outcome of a governance evaluation. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct GovernanceResult {
    /// 0..=100
    pub score: u32,
    /// Human-readable issue list: missing required, missing optional, block reasons
    pub issues: Vec<String>,
    pub required_sections: Vec<String>,
    pub missing_required: Vec<String>,
    pub missing_optional: Vec<String>,
    pub blocked: bool,
    pub block_reasons: Vec<String>,
}

impl GovernanceResult {
    /// Block reasons as findings for the combined assessment.
    ///
    /// Medium severity and no points: governance gaps alone must not force a
    /// BLOCK decision or move the score.
    pub fn as_findings(&self) -> Vec<Finding> {
        self.block_reasons
            .iter()
            .map(|reason| {
                let (category, recommendation) = if reason == BLOCK_REASON_RISK_GATE {
                    (
                        FindingCategory::Compliance,
                        "Resolve the Risk Gate findings or record an approved override".to_string(),
                    )
                } else if self.missing_required.is_empty() {
                    (
                        FindingCategory::IncompleteContent,
                        "Complete the remaining template sections".to_string(),
                    )
                } else {
                    (
                        FindingCategory::MissingSection,
                        format!("Add content for: {}", self.missing_required.join(", ")),
                    )
                };
                Finding::new(category, Severity::Medium, "Governance", reason.clone(), recommendation)
            })
            .collect()
    }
}

/// Checklist for a template key; unmatched keys use the last (default) entry.
pub fn checklist_for(template_key: Option<&str>) -> &'static SectionChecklist {
    let key = template_key.unwrap_or_default().trim().to_lowercase();
    SECTION_CHECKLISTS
        .iter()
        .find(|checklist| checklist.keywords.iter().any(|kw| key.contains(kw)))
        .or_else(|| SECTION_CHECKLISTS.last())
        .unwrap_or(&PROPOSAL_CHECKLIST)
}

/// Evaluate governance readiness.
pub fn evaluate_governance(
    input: &GovernanceInput<'_>,
    thresholds: &GovernanceThresholds,
) -> GovernanceResult {
    let checklist = checklist_for(input.template_key);
    let sections = resolve_sections(input.sections, input.content);

    let missing_required: Vec<String> = checklist
        .required
        .iter()
        .filter(|name| !has_content(&sections, name))
        .map(|name| name.to_string())
        .collect();
    let missing_optional: Vec<String> = checklist
        .optional
        .iter()
        .filter(|name| !has_content(&sections, name))
        .map(|name| name.to_string())
        .collect();

    let score = completeness_score(
        checklist.required.len() - missing_required.len(),
        checklist.required.len(),
    );

    let mut block_reasons = Vec::new();
    if input.risk_gate_status == Some(GateStatus::Block) && !input.risk_gate_overridden {
        block_reasons.push(BLOCK_REASON_RISK_GATE.to_string());
    }
    let failing = score < thresholds.pass_threshold;
    if failing {
        block_reasons.push(BLOCK_REASON_MANDATORY.to_string());
    }
    // Only strengthens an already failing score.
    if failing && missing_optional.len() >= thresholds.compound_optional_threshold {
        block_reasons.push(BLOCK_REASON_COMPOUND.to_string());
    }

    let mut issues: Vec<String> = missing_required
        .iter()
        .map(|name| format!("{} is required", name))
        .collect();
    if !missing_optional.is_empty() {
        issues.push(format!(
            "Optional sections missing: {}",
            missing_optional.join(", ")
        ));
    }
    issues.extend(block_reasons.iter().cloned());

    GovernanceResult {
        score,
        issues,
        required_sections: checklist.required.iter().map(|s| s.to_string()).collect(),
        missing_required,
        missing_optional,
        blocked: !block_reasons.is_empty(),
        block_reasons,
    }
}

fn completeness_score(completed: usize, required: usize) -> u32 {
    if required == 0 {
        return 0;
    }
    (100.0 * completed as f64 / required as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluate(template: &str, sections: serde_json::Value) -> GovernanceResult {
        evaluate_governance(
            &GovernanceInput {
                template_key: Some(template),
                sections: Some(&sections),
                ..Default::default()
            },
            &GovernanceThresholds::default(),
        )
    }

    #[test]
    fn test_checklist_selection() {
        assert_eq!(checklist_for(Some("Client SOW v2")).name, "sow");
        assert_eq!(checklist_for(Some("statement-of-work")).name, "sow");
        assert_eq!(checklist_for(Some("rfp_response")).name, "rfi");
        assert_eq!(checklist_for(Some("RFI")).name, "rfi");
        assert_eq!(checklist_for(Some("consulting")).name, "proposal");
        assert_eq!(checklist_for(None).name, "proposal");
    }

    #[test]
    fn test_complete_required_with_missing_optional_is_not_blocked() {
        let result = evaluate(
            "proposal",
            json!({
                "Executive Summary": "Summary",
                "Scope & Deliverables": "Scope",
                "Methodology": "Agile",
                "Assumptions": "Access to systems",
                "Risks": "Timeline"
            }),
        );
        assert_eq!(result.score, 100);
        assert_eq!(result.missing_optional.len(), 3);
        assert!(!result.blocked);
        assert!(result.block_reasons.is_empty());
        assert_eq!(
            result.issues,
            vec!["Optional sections missing: References, Team Bios, Conclusion"]
        );
    }

    #[test]
    fn test_failing_score_compounds_with_optional_gaps() {
        let result = evaluate(
            "proposal",
            json!({
                "Executive Summary": "Summary",
                "Scope & Deliverables": "Scope",
                "Methodology": "   "
            }),
        );
        assert_eq!(result.score, 50);
        assert_eq!(result.missing_required, vec!["Methodology", "Assumptions"]);
        assert_eq!(
            result.block_reasons,
            vec![BLOCK_REASON_MANDATORY, BLOCK_REASON_COMPOUND]
        );
        assert!(result.blocked);
        assert_eq!(result.issues[0], "Methodology is required");
    }

    #[test]
    fn test_risk_gate_block_is_additive() {
        let sections = json!({
            "Executive Summary": "a",
            "Scope & Deliverables": "b",
            "Methodology": "c"
        });
        let input = GovernanceInput {
            template_key: Some("rfi"),
            sections: Some(&sections),
            risk_gate_status: Some(GateStatus::Block),
            ..Default::default()
        };
        let result = evaluate_governance(&input, &GovernanceThresholds::default());
        assert_eq!(result.score, 100);
        assert_eq!(result.block_reasons, vec![BLOCK_REASON_RISK_GATE]);

        let overridden = GovernanceInput {
            risk_gate_overridden: true,
            ..input
        };
        let result = evaluate_governance(&overridden, &GovernanceThresholds::default());
        assert!(!result.blocked);
    }

    #[test]
    fn test_sow_rounding() {
        let result = evaluate(
            "sow",
            json!({
                "Executive Summary": "a",
                "Investment": "b"
            }),
        );
        assert_eq!(result.score, 40);
        assert_eq!(result.required_sections.len(), 5);
    }

    #[test]
    fn test_rfi_two_of_three_rounds_up() {
        let result = evaluate(
            "rfi",
            json!({"Executive Summary": "a", "Methodology": "b"}),
        );
        assert_eq!(result.score, 67);
    }

    #[test]
    fn test_sections_from_content_document() {
        let content = json!({
            "sections": [
                {"title": "Executive Summary", "content": "a"},
                {"title": "Scope & Deliverables", "content": "b"},
                {"title": "Methodology", "content": "c"},
                {"title": "Assumptions", "content": "d"}
            ]
        })
        .to_string();
        let result = evaluate_governance(
            &GovernanceInput {
                content: Some(&content),
                ..Default::default()
            },
            &GovernanceThresholds::default(),
        );
        assert_eq!(result.score, 100);
        assert!(!result.blocked);
    }

    #[test]
    fn test_block_reasons_as_findings() {
        let result = evaluate("proposal", json!({}));
        let findings = result.as_findings();
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Medium));
        assert!(findings.iter().all(|f| f.points.is_none()));
        assert_eq!(findings[0].category, FindingCategory::MissingSection);
        assert_eq!(findings[0].description, BLOCK_REASON_MANDATORY);
    }

    #[test]
    fn test_custom_threshold() {
        let thresholds = GovernanceThresholds {
            pass_threshold: 50,
            compound_optional_threshold: 2,
        };
        let sections = json!({"Executive Summary": "a", "Scope & Deliverables": "b"});
        let result = evaluate_governance(
            &GovernanceInput {
                sections: Some(&sections),
                ..Default::default()
            },
            &thresholds,
        );
        assert_eq!(result.score, 50);
        assert!(!result.blocked);
    }
}
