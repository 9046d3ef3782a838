//! Risk combination and decision mapping.

use crate::policy::{
    DEFAULT_SUMMARY, MAX_RUN_SCORE, MIN_RUN_SCORE, STATUS_BLOCK_AT, STATUS_REVIEW_AT,
};
use crate::types::{Assessment, Finding, GateStatus};

/// Merge precheck and AI assessments.
///
/// Scores are summed unclamped, findings keep precheck-then-AI order and the
/// level is recomputed from the combined score.
pub fn combine(precheck: &Assessment, ai: &Assessment) -> Assessment {
    let risk_score = precheck.risk_score.saturating_add(ai.risk_score);

    let findings: Vec<Finding> = precheck
        .findings
        .iter()
        .chain(ai.findings.iter())
        .cloned()
        .collect();

    let summary = [precheck.summary.trim(), ai.summary.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let summary = if summary.is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else {
        summary
    };

    Assessment::from_score(risk_score, findings, summary)
}

/// Map a score and findings to the external decision.
///
/// Any high or critical finding forces BLOCK regardless of score.
pub fn map_to_status(risk_score: i64, findings: &[Finding]) -> GateStatus {
    if findings.iter().any(|f| f.severity.is_blocking()) || risk_score >= STATUS_BLOCK_AT {
        GateStatus::Block
    } else if risk_score >= STATUS_REVIEW_AT {
        GateStatus::Review
    } else {
        GateStatus::Pass
    }
}

/// Clamp a combined score into the persisted range.
pub fn clamp_score(risk_score: i64) -> i64 {
    risk_score.clamp(MIN_RUN_SCORE, MAX_RUN_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FindingCategory, RiskLevel, Severity};

    fn finding(severity: Severity) -> Finding {
        Finding::new(FindingCategory::Clarity, severity, "Scope", "d", "r")
    }

    #[test]
    fn test_status_boundaries() {
        assert_eq!(map_to_status(80, &[]), GateStatus::Block);
        assert_eq!(map_to_status(79, &[]), GateStatus::Review);
        assert_eq!(map_to_status(40, &[]), GateStatus::Review);
        assert_eq!(map_to_status(39, &[]), GateStatus::Pass);
        assert_eq!(map_to_status(-5, &[]), GateStatus::Pass);
    }

    #[test]
    fn test_blocking_finding_overrides_score() {
        assert_eq!(map_to_status(0, &[finding(Severity::High)]), GateStatus::Block);
        assert_eq!(map_to_status(5, &[finding(Severity::Critical)]), GateStatus::Block);
        assert_eq!(map_to_status(5, &[finding(Severity::Medium)]), GateStatus::Pass);
    }

    #[test]
    fn test_combine_orders_and_sums() {
        let precheck = Assessment::from_score(
            55,
            vec![finding(Severity::Medium).with_points(55)],
            "Deterministic prechecks flagged 1 issue(s).",
        );
        let ai = Assessment::from_score(
            30,
            vec![Finding::new(FindingCategory::Compliance, Severity::Low, "Terms", "d", "r")],
            "Minor wording issues.",
        );
        let combined = combine(&precheck, &ai);
        assert_eq!(combined.risk_score, 85);
        assert_eq!(combined.overall_risk_level, RiskLevel::Critical);
        assert!(!combined.can_release);
        assert_eq!(combined.findings[0].category, FindingCategory::Clarity);
        assert_eq!(combined.findings[1].category, FindingCategory::Compliance);
        assert_eq!(
            combined.summary,
            "Deterministic prechecks flagged 1 issue(s). Minor wording issues."
        );
        assert_eq!(map_to_status(combined.risk_score, &combined.findings), GateStatus::Block);
    }

    #[test]
    fn test_combine_default_summary() {
        let empty = Assessment::from_score(0, vec![], "");
        let combined = combine(&empty, &empty);
        assert_eq!(combined.summary, DEFAULT_SUMMARY);
        assert_eq!(map_to_status(combined.risk_score, &combined.findings), GateStatus::Pass);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_score(185), 100);
        assert_eq!(clamp_score(-3), 0);
        assert_eq!(clamp_score(42), 42);
    }
}
