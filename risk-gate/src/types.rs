//! Core value types shared by every evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::policy::{RISK_LEVEL_CRITICAL, RISK_LEVEL_HIGH, RISK_LEVEL_MEDIUM};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical findings force a BLOCK decision.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Lenient parse for provider output; unknown values read as medium.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

/// Category of a finding.
///
/// The AI provider may report categories outside the known set; those are
/// kept verbatim in [`FindingCategory::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FindingCategory {
    MissingTitle,
    MissingClientName,
    MissingClientEmail,
    InsufficientContent,
    MissingSection,
    IncompleteContent,
    Compliance,
    Clarity,
    PiiDetected,
    Overpromising,
    PlaceholderContent,
    AnalysisError,
    Other(String),
}

impl FindingCategory {
    pub fn as_str(&self) -> &str {
        match self {
            FindingCategory::MissingTitle => "missing_title",
            FindingCategory::MissingClientName => "missing_client_name",
            FindingCategory::MissingClientEmail => "missing_client_email",
            FindingCategory::InsufficientContent => "insufficient_content",
            FindingCategory::MissingSection => "missing_section",
            FindingCategory::IncompleteContent => "incomplete_content",
            FindingCategory::Compliance => "compliance",
            FindingCategory::Clarity => "clarity",
            FindingCategory::PiiDetected => "pii_detected",
            FindingCategory::Overpromising => "overpromising",
            FindingCategory::PlaceholderContent => "placeholder_content",
            FindingCategory::AnalysisError => "analysis_error",
            FindingCategory::Other(other) => other,
        }
    }
}

impl From<String> for FindingCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "missing_title" => FindingCategory::MissingTitle,
            "missing_client_name" => FindingCategory::MissingClientName,
            "missing_client_email" => FindingCategory::MissingClientEmail,
            "insufficient_content" => FindingCategory::InsufficientContent,
            "missing_section" => FindingCategory::MissingSection,
            "incomplete_content" => FindingCategory::IncompleteContent,
            "compliance" => FindingCategory::Compliance,
            "clarity" => FindingCategory::Clarity,
            "pii_detected" => FindingCategory::PiiDetected,
            "overpromising" => FindingCategory::Overpromising,
            "placeholder_content" => FindingCategory::PlaceholderContent,
            "analysis_error" => FindingCategory::AnalysisError,
            _ => FindingCategory::Other(value),
        }
    }
}

impl From<FindingCategory> for String {
    fn from(value: FindingCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected issue. Created by exactly one evaluator and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Finding {
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub category: FindingCategory,
    pub severity: Severity,
    pub section: String,
    pub description: String,
    pub recommendation: String,
    /// Risk contribution; absent for most AI-sourced findings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

impl Finding {
    pub fn new(
        category: FindingCategory,
        severity: Severity,
        section: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            section: section.into(),
            description: description.into(),
            recommendation: recommendation.into(),
            points: None,
        }
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    /// Lower-cased `category description recommendation`, used for KB keyword matching.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.category.as_str(),
            self.description,
            self.recommendation
        )
        .to_lowercase()
    }
}

/// Local risk level derived from a score (thresholds 30/60/80).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: i64) -> Self {
        if score >= RISK_LEVEL_CRITICAL {
            RiskLevel::Critical
        } else if score >= RISK_LEVEL_HIGH {
            RiskLevel::High
        } else if score >= RISK_LEVEL_MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Local release opinion: only low and medium may be released.
    pub fn can_release(&self) -> bool {
        matches!(self, RiskLevel::Low | RiskLevel::Medium)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Externally visible release decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum GateStatus {
    Pass,
    Review,
    Block,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Pass => "PASS",
            GateStatus::Review => "REVIEW",
            GateStatus::Block => "BLOCK",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(GateStatus::Pass),
            "REVIEW" => Ok(GateStatus::Review),
            "BLOCK" => Ok(GateStatus::Block),
            other => Err(format!("unknown gate status: {}", other)),
        }
    }
}

/// Scored result of one or more evaluators.
///
/// Produced by the precheck evaluator and, merged with AI output, by the
/// combiner. `risk_score` is unclamped here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Assessment {
    pub risk_score: i64,
    pub overall_risk_level: RiskLevel,
    pub can_release: bool,
    pub findings: Vec<Finding>,
    pub summary: String,
}

impl Assessment {
    /// Build an assessment, deriving level and release opinion from the score.
    pub fn from_score(risk_score: i64, findings: Vec<Finding>, summary: impl Into<String>) -> Self {
        let overall_risk_level = RiskLevel::from_score(risk_score);
        Self {
            risk_score,
            overall_risk_level,
            can_release: overall_risk_level.can_release(),
            findings,
            summary: summary.into(),
        }
    }
}

/// Internal risk opinion recorded next to the external decision.
///
/// Absent on hard-blocked runs, which never reach the evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RiskAudit {
    /// Unclamped precheck plus AI score
    pub combined_score: i64,
    pub overall_risk_level: RiskLevel,
    pub can_release: bool,
    pub precheck_summary: String,
    pub ai_summary: String,
    pub summary: String,
}

impl RiskAudit {
    pub fn new(precheck: &Assessment, ai: &Assessment, combined: &Assessment) -> Self {
        Self {
            combined_score: combined.risk_score,
            overall_risk_level: combined.overall_risk_level,
            can_release: combined.can_release,
            precheck_summary: precheck.summary.clone(),
            ai_summary: ai.summary.clone(),
            summary: combined.summary.clone(),
        }
    }
}

/// Redaction outcome attached to every persisted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RedactionSummary {
    pub blocked: bool,
    pub reasons: Vec<String>,
    pub sanitized_payload_hash: Option<String>,
}

/// Read-only reference clause from the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct KnowledgeBaseClause {
    /// Clause row id; citations are ordered by it
    pub id: i64,
    pub clause_key: String,
    pub document_id: i64,
    pub document_key: String,
    pub title: String,
    pub category: String,
    pub severity: String,
    pub clause_text: String,
    pub recommended_text: Option<String>,
    pub tags: Vec<String>,
}

/// A proposal as loaded from the proposal store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Proposal {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    /// Body text, or a JSON document with an embedded `sections` array
    #[serde(default)]
    pub content: Option<String>,
    /// Section map, or a JSON-encoded section map
    #[serde(default)]
    pub sections: Option<serde_json::Value>,
    #[serde(default)]
    pub template_key: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// A persisted evaluation. Append-only; mutated once by an accepted override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RiskGateRun {
    pub id: i64,
    pub proposal_id: i64,
    pub requested_by: String,
    pub status: GateStatus,
    /// Clamped to 0..=100
    pub risk_score: i64,
    pub findings: Vec<Finding>,
    pub kb_citations: Vec<KnowledgeBaseClause>,
    pub redaction_summary: RedactionSummary,
    pub risk_audit: Option<RiskAudit>,
    pub created_at: DateTime<Utc>,
    pub overridden: bool,
    pub override_reason: Option<String>,
    pub overridden_by: Option<String>,
    pub overridden_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new run.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRiskGateRun {
    pub proposal_id: i64,
    pub requested_by: String,
    pub status: GateStatus,
    pub risk_score: i64,
    pub findings: Vec<Finding>,
    pub kb_citations: Vec<KnowledgeBaseClause>,
    pub redaction_summary: RedactionSummary,
    pub risk_audit: Option<RiskAudit>,
}

/// Immutable override audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct OverrideRecord {
    pub id: i64,
    pub run_id: i64,
    pub reason: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

/// Response of the `Analyze` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalyzeOutcome {
    pub run_id: i64,
    pub status: GateStatus,
    pub risk_score: i64,
    pub findings: Vec<Finding>,
    pub kb_citations: Vec<KnowledgeBaseClause>,
    pub redaction_summary: RedactionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_audit: Option<RiskAudit>,
}

impl From<RiskGateRun> for AnalyzeOutcome {
    fn from(run: RiskGateRun) -> Self {
        Self {
            run_id: run.id,
            status: run.status,
            risk_score: run.risk_score,
            findings: run.findings,
            kb_citations: run.kb_citations,
            redaction_summary: run.redaction_summary,
            risk_audit: run.risk_audit,
        }
    }
}

/// Response of the `Override` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct OverrideOutcome {
    pub run_id: i64,
    pub proposal_id: i64,
    pub overridden: bool,
    /// True when the run had already been overridden before this call
    pub already_overridden: bool,
    #[serde(rename = "override")]
    pub override_record: OverrideRecord,
}

/// Filters for the `Summary` operation. Empty filter matches every proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProposalFilter {
    #[serde(default)]
    pub proposal_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub template_key: Option<String>,
}

/// Per-status counts of the latest run per proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub struct StatusCounts {
    pub pass: u64,
    pub review: u64,
    pub block: u64,
    pub none: u64,
}

/// Response of the `Summary` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SummaryReport {
    /// Worst latest status across proposals: BLOCK, REVIEW, PASS or NONE
    pub overall_level: String,
    pub counts: StatusCounts,
    pub total_proposals: u64,
    pub analyzed_proposals: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(250), RiskLevel::Critical);
        assert!(RiskLevel::Medium.can_release());
        assert!(!RiskLevel::High.can_release());
    }

    #[test]
    fn test_category_serde_keeps_unknown_values() {
        let known: FindingCategory = serde_json::from_str("\"pii_detected\"").unwrap();
        assert_eq!(known, FindingCategory::PiiDetected);

        let custom: FindingCategory = serde_json::from_str("\"pricing_ambiguity\"").unwrap();
        assert_eq!(custom.as_str(), "pricing_ambiguity");
        assert_eq!(serde_json::to_string(&custom).unwrap(), "\"pricing_ambiguity\"");
    }

    #[test]
    fn test_gate_status_wire_format() {
        assert_eq!(serde_json::to_string(&GateStatus::Review).unwrap(), "\"REVIEW\"");
        assert_eq!("block".parse::<GateStatus>().unwrap(), GateStatus::Block);
        assert!("maybe".parse::<GateStatus>().is_err());
    }

    #[test]
    fn test_override_outcome_uses_override_key() {
        let outcome = OverrideOutcome {
            run_id: 1,
            proposal_id: 2,
            overridden: true,
            already_overridden: false,
            override_record: OverrideRecord {
                id: 3,
                run_id: 1,
                reason: "Client accepted risk".into(),
                approved_by: "ceo".into(),
                approved_at: Utc::now(),
            },
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["override"]["id"], 3);
    }
}
