//! Policy tables.
//!
//! Every tunable constant of the decision engine lives here as named data:
//! precheck points and phrase lists, score thresholds, template section
//! checklists, knowledge-base keyword groups and the override role
//! allow-list. Evaluators read these tables; they never inline literals.

use crate::types::Severity;

// =============================================================================
// Score thresholds
// =============================================================================

/// Local risk level boundaries (`overall_risk_level` / `can_release`).
pub const RISK_LEVEL_MEDIUM: i64 = 30;
pub const RISK_LEVEL_HIGH: i64 = 60;
pub const RISK_LEVEL_CRITICAL: i64 = 80;

/// External decision boundaries (PASS / REVIEW / BLOCK).
///
/// Not the same boundaries as the local risk level above.
pub const STATUS_REVIEW_AT: i64 = 40;
pub const STATUS_BLOCK_AT: i64 = 80;

/// Persisted run scores are clamped to this range.
pub const MIN_RUN_SCORE: i64 = 0;
pub const MAX_RUN_SCORE: i64 = 100;

/// Score recorded for a hard-blocked proposal.
pub const HARD_BLOCK_SCORE: i64 = 100;

// =============================================================================
// Precheck rules
// =============================================================================

/// A fixed precheck rule: points added and severity when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecheckRule {
    pub points: u32,
    pub severity: Severity,
}

pub const RULE_MISSING_TITLE: PrecheckRule = PrecheckRule {
    points: 10,
    severity: Severity::Medium,
};
pub const RULE_MISSING_CLIENT_NAME: PrecheckRule = PrecheckRule {
    points: 20,
    severity: Severity::High,
};
pub const RULE_MISSING_CLIENT_EMAIL: PrecheckRule = PrecheckRule {
    points: 20,
    severity: Severity::High,
};
pub const RULE_INSUFFICIENT_CONTENT: PrecheckRule = PrecheckRule {
    points: 25,
    severity: Severity::High,
};
pub const RULE_PII: PrecheckRule = PrecheckRule {
    points: 60,
    severity: Severity::Critical,
};
pub const RULE_OVERPROMISING: PrecheckRule = PrecheckRule {
    points: 20,
    severity: Severity::High,
};

/// Placeholder content: base points, per additional distinct phrase, cap.
pub const PLACEHOLDER_BASE_POINTS: u32 = 15;
pub const PLACEHOLDER_EXTRA_POINTS: u32 = 5;
pub const PLACEHOLDER_MAX_POINTS: u32 = 30;
pub const PLACEHOLDER_SEVERITY: Severity = Severity::High;

/// Minimum length of the concatenated proposal text.
pub const MIN_CONTENT_CHARS: usize = 400;

/// Client names that count as missing.
pub const PLACEHOLDER_CLIENT_NAMES: &[&str] = &[
    "client",
    "client name",
    "[client]",
    "{{client}}",
    "tbd",
    "n/a",
    "unknown",
];

/// Phrases that mark unfinished template text.
pub const PLACEHOLDER_PHRASES: &[&str] = &[
    "lorem ipsum",
    "tbd",
    "to be determined",
    "[insert",
    "{{",
    "xxx",
    "placeholder",
    "coming soon",
];

/// Absolute-guarantee language.
pub const GUARANTEE_PHRASES: &[&str] = &["guarantee", "100%", "no risk", "sure thing"];

/// Crude PII shapes checked by the precheck (not the sanitizer).
pub const PII_PATTERNS: &[(&str, &str)] = &[
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    ("card_number", r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b"),
];

// =============================================================================
// Governance checklists
// =============================================================================

/// Required and optional sections for one template family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionChecklist {
    pub name: &'static str,
    /// Template-key substrings selecting this checklist
    pub keywords: &'static [&'static str],
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

pub const SOW_CHECKLIST: SectionChecklist = SectionChecklist {
    name: "sow",
    keywords: &["sow", "statement"],
    required: &[
        "Executive Summary",
        "Scope & Deliverables",
        "Investment",
        "Assumptions",
        "Terms and Conditions",
    ],
    optional: &["Risks", "References", "Team Bios", "Methodology"],
};

pub const RFI_CHECKLIST: SectionChecklist = SectionChecklist {
    name: "rfi",
    keywords: &["rfi", "rfp"],
    required: &["Executive Summary", "Scope & Deliverables", "Methodology"],
    optional: &["Assumptions", "Risks", "References", "Team Bios"],
};

pub const PROPOSAL_CHECKLIST: SectionChecklist = SectionChecklist {
    name: "proposal",
    keywords: &[],
    required: &[
        "Executive Summary",
        "Scope & Deliverables",
        "Methodology",
        "Assumptions",
    ],
    optional: &["Risks", "References", "Team Bios", "Conclusion"],
};

/// Checklists in match order; the last entry is the fallback.
pub const SECTION_CHECKLISTS: &[SectionChecklist] =
    &[SOW_CHECKLIST, RFI_CHECKLIST, PROPOSAL_CHECKLIST];

pub const DEFAULT_PASS_THRESHOLD: u32 = 80;
pub const DEFAULT_COMPOUND_OPTIONAL_THRESHOLD: usize = 2;

pub const BLOCK_REASON_RISK_GATE: &str = "Risk Gate is blocking release";
pub const BLOCK_REASON_MANDATORY: &str = "Mandatory sections incomplete";
pub const BLOCK_REASON_COMPOUND: &str = "Multiple governance gaps detected";

// =============================================================================
// Knowledge base citations
// =============================================================================

/// Keywords that attach a knowledge-base clause to a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseKeywordGroup {
    pub clause_key: &'static str,
    pub keywords: &'static [&'static str],
}

pub const CLAUSE_KEYWORD_GROUPS: &[ClauseKeywordGroup] = &[
    ClauseKeywordGroup {
        clause_key: "no_credentials_minimum",
        keywords: &["credential", "api key", "apikey", "secret", "token", "password"],
    },
    ClauseKeywordGroup {
        clause_key: "pii_handling_minimum",
        keywords: &[
            "pii",
            "personal data",
            "personal information",
            "id number",
            "passport",
            "email",
            "phone",
        ],
    },
    ClauseKeywordGroup {
        clause_key: "confidentiality_minimum",
        keywords: &["confidential", "confidentiality", "nda", "non-disclosure"],
    },
];

// =============================================================================
// Overrides and adapter failure
// =============================================================================

/// Roles allowed to override a decision (compared case-insensitively).
pub const OVERRIDE_ROLES: &[&str] = &[
    "admin",
    "ceo",
    "manager",
    "approver",
    "finance",
    "financial manager",
];

pub const ANALYSIS_ERROR_SCORE: i64 = 50;
pub const ANALYSIS_ERROR_SECTION: &str = "AI Analysis";
pub const ANALYSIS_ERROR_RECOMMENDATION: &str = "Manual review required";

/// Fallback when neither evaluator produced a summary.
pub const DEFAULT_SUMMARY: &str = "Risk assessment complete.";
