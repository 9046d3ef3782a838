//! Knowledge-base citations for findings.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::policy::{ClauseKeywordGroup, CLAUSE_KEYWORD_GROUPS};
use crate::store::KnowledgeBase;
use crate::types::{Finding, KnowledgeBaseClause};

/// Sorted clause keys whose keyword group matches any finding.
pub fn matching_clause_keys(findings: &[Finding]) -> Vec<&'static str> {
    matching_clause_keys_with(findings, CLAUSE_KEYWORD_GROUPS)
}

pub fn matching_clause_keys_with(
    findings: &[Finding],
    groups: &'static [ClauseKeywordGroup],
) -> Vec<&'static str> {
    let texts: Vec<String> = findings.iter().map(Finding::search_text).collect();
    let mut keys = BTreeSet::new();

    for group in groups {
        let hit = texts
            .iter()
            .any(|text| group.keywords.iter().any(|kw| text.contains(kw)));
        if hit {
            keys.insert(group.clause_key);
        }
    }
    keys.into_iter().collect()
}

/// Resolve citations for findings, ordered by clause id.
///
/// No keyword match yields an empty list without touching the knowledge base.
pub async fn build_citations(
    kb: &dyn KnowledgeBase,
    findings: &[Finding],
) -> Result<Vec<KnowledgeBaseClause>> {
    let keys = matching_clause_keys(findings);
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = kb.lookup_clauses(&keys).await?;
    clauses.sort_by_key(|clause| clause.id);
    debug!(keys = ?keys, citations = clauses.len(), "Resolved knowledge base citations");
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{FindingCategory, Severity};

    fn finding(category: FindingCategory, description: &str) -> Finding {
        Finding::new(category, Severity::High, "Content", description, "Fix it")
    }

    #[test]
    fn test_keyword_matching() {
        let findings = vec![
            finding(FindingCategory::PiiDetected, "Possible personal data detected (ssn)"),
            finding(FindingCategory::Compliance, "Missing NDA reference"),
        ];
        let keys = matching_clause_keys(&findings);
        assert_eq!(keys, vec!["confidentiality_minimum", "pii_handling_minimum"]);
    }

    #[test]
    fn test_category_text_participates() {
        let findings = vec![finding(
            FindingCategory::Other("secret_exposure".into()),
            "Something leaked",
        )];
        assert_eq!(matching_clause_keys(&findings), vec!["no_credentials_minimum"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        let findings = vec![finding(FindingCategory::Clarity, "Vague timeline")];
        let citations = build_citations(&store, &findings).await.unwrap();
        assert!(citations.is_empty());
    }

    #[tokio::test]
    async fn test_citations_sorted_by_clause_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let findings = vec![
            finding(FindingCategory::Compliance, "API key pasted in appendix"),
            finding(FindingCategory::Compliance, "Not marked confidential"),
        ];
        let citations = build_citations(&store, &findings).await.unwrap();
        let ids: Vec<i64> = citations.iter().map(|c| c.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].clause_key, "confidentiality_minimum");
        assert_eq!(citations[1].clause_key, "no_credentials_minimum");
    }
}
