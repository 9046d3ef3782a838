//! Deterministic prechecks.
//!
//! Cheap rule-based checks over the raw proposal. Each rule adds fixed
//! points from [`crate::policy`]; the sum is left unclamped.

use regex::Regex;
use std::sync::OnceLock;

use crate::policy::{
    PrecheckRule, GUARANTEE_PHRASES, MIN_CONTENT_CHARS, PII_PATTERNS, PLACEHOLDER_BASE_POINTS,
    PLACEHOLDER_CLIENT_NAMES, PLACEHOLDER_EXTRA_POINTS, PLACEHOLDER_MAX_POINTS,
    PLACEHOLDER_PHRASES, PLACEHOLDER_SEVERITY, RULE_INSUFFICIENT_CONTENT,
    RULE_MISSING_CLIENT_EMAIL, RULE_MISSING_CLIENT_NAME, RULE_MISSING_TITLE, RULE_OVERPROMISING,
    RULE_PII,
};
use crate::sections::SectionSource;
use crate::types::{Assessment, Finding, FindingCategory, Proposal};

fn pii_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PII_PATTERNS
            .iter()
            .map(|(name, pattern)| (*name, Regex::new(pattern).expect("PII pattern compiles")))
            .collect()
    })
}

/// Run every precheck rule against a proposal.
pub fn run_prechecks(proposal: &Proposal) -> Assessment {
    let blob = text_blob(proposal);
    let lowered = blob.to_lowercase();

    let mut score: i64 = 0;
    let mut findings = Vec::new();
    let mut add = |finding: Finding, points: u32| {
        score += i64::from(points);
        findings.push(finding.with_points(points));
    };

    if is_blank(proposal.title.as_deref()) {
        add(
            rule_finding(
                FindingCategory::MissingTitle,
                RULE_MISSING_TITLE,
                "Header",
                "Proposal is missing a title",
                "Add a descriptive title",
            ),
            RULE_MISSING_TITLE.points,
        );
    }

    if is_placeholder_client(proposal.client.as_deref()) {
        add(
            rule_finding(
                FindingCategory::MissingClientName,
                RULE_MISSING_CLIENT_NAME,
                "Client",
                "Client name is missing or a placeholder",
                "Enter the client's legal name",
            ),
            RULE_MISSING_CLIENT_NAME.points,
        );
    }

    let email_ok = proposal
        .client_email
        .as_deref()
        .map(|email| email.contains('@'))
        .unwrap_or(false);
    if !email_ok {
        add(
            rule_finding(
                FindingCategory::MissingClientEmail,
                RULE_MISSING_CLIENT_EMAIL,
                "Client",
                "Client email is missing or malformed",
                "Provide a valid client contact email",
            ),
            RULE_MISSING_CLIENT_EMAIL.points,
        );
    }

    if blob.trim().chars().count() < MIN_CONTENT_CHARS {
        add(
            rule_finding(
                FindingCategory::InsufficientContent,
                RULE_INSUFFICIENT_CONTENT,
                "Content",
                format!(
                    "Proposal content is under {} characters",
                    MIN_CONTENT_CHARS
                ),
                "Expand the proposal with scope, approach and commercial detail",
            ),
            RULE_INSUFFICIENT_CONTENT.points,
        );
    }

    let placeholders: Vec<&str> = PLACEHOLDER_PHRASES
        .iter()
        .copied()
        .filter(|phrase| lowered.contains(phrase))
        .collect();
    if !placeholders.is_empty() {
        let extra = u32::try_from(placeholders.len() - 1).unwrap_or(u32::MAX);
        let points = PLACEHOLDER_BASE_POINTS
            .saturating_add(extra.saturating_mul(PLACEHOLDER_EXTRA_POINTS))
            .min(PLACEHOLDER_MAX_POINTS);
        add(
            Finding::new(
                FindingCategory::PlaceholderContent,
                PLACEHOLDER_SEVERITY,
                "Content",
                format!("Placeholder text found: {}", placeholders.join(", ")),
                "Replace template placeholders with final wording",
            ),
            points,
        );
    }

    let pii_hits: Vec<&str> = pii_patterns()
        .iter()
        .filter(|(_, regex)| regex.is_match(&blob))
        .map(|(name, _)| *name)
        .collect();
    if !pii_hits.is_empty() {
        add(
            rule_finding(
                FindingCategory::PiiDetected,
                RULE_PII,
                "Content",
                format!("Possible personal data detected ({})", pii_hits.join(", ")),
                "Remove personal identifiers before release",
            ),
            RULE_PII.points,
        );
    }

    if GUARANTEE_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        add(
            rule_finding(
                FindingCategory::Overpromising,
                RULE_OVERPROMISING,
                "Content",
                "Proposal uses absolute guarantee language",
                "Qualify commitments and avoid guarantees",
            ),
            RULE_OVERPROMISING.points,
        );
    }

    let summary = if findings.is_empty() {
        String::new()
    } else {
        format!("Deterministic prechecks flagged {} issue(s).", findings.len())
    };

    Assessment::from_score(score, findings, summary)
}

fn rule_finding(
    category: FindingCategory,
    rule: PrecheckRule,
    section: &str,
    description: impl Into<String>,
    recommendation: &str,
) -> Finding {
    Finding::new(category, rule.severity, section, description, recommendation)
}

/// Title, client, email, body and, when supplied separately, section texts.
fn text_blob(proposal: &Proposal) -> String {
    let mut parts: Vec<String> = [
        &proposal.title,
        &proposal.client,
        &proposal.client_email,
        &proposal.content,
    ]
    .into_iter()
    .flatten()
    .cloned()
    .collect();

    let source = SectionSource::resolve(proposal.sections.as_ref(), proposal.content.as_deref());
    if source.is_explicit() {
        parts.extend(source.into_map().into_values());
    }

    parts.join("\n")
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn is_placeholder_client(client: Option<&str>) -> bool {
    match client {
        None => true,
        Some(name) => {
            let name = name.trim().to_lowercase();
            name.is_empty() || PLACEHOLDER_CLIENT_NAMES.contains(&name.as_str())
        }
    }
}
