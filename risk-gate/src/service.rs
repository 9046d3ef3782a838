//! RiskGateService - inbound operations of the decision engine.
//!
//! Orchestrates one evaluation:
//!
//! ```text
//! load proposal ─► sanitize ─┬─ blocked ──────────────────────────► persist BLOCK/100
//!                            │
//!                            └─ clean ─┬─ AI findings adapter ─┐
//!                                      └─ prechecks+governance ┴─► combine ─► cite ─► map ─► persist
//! ```
//!
//! Persistence is always the last step, so a failed evaluation leaves no run.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ai::{AdapterOutcome, AiFindingsAdapter, FindingsProvider};
use crate::citations::build_citations;
use crate::combiner::{clamp_score, combine, map_to_status};
use crate::config::RiskGateConfig;
use crate::error::{Result, RiskGateError};
use crate::governance::{evaluate_governance, GovernanceInput, GovernanceResult};
use crate::overrides::{OverrideController, OverrideRequest};
use crate::policy::HARD_BLOCK_SCORE;
use crate::precheck::run_prechecks;
use crate::sanitizer::{payload_hash, sanitize};
use crate::store::{IdentityStore, KnowledgeBase, ProposalStore, RunStore, SqliteStore};
use crate::types::{
    AnalyzeOutcome, GateStatus, NewRiskGateRun, OverrideOutcome, Proposal, ProposalFilter,
    RedactionSummary, RiskAudit, StatusCounts, SummaryReport,
};

/// Storage collaborators used by the service.
#[derive(Clone)]
pub struct Stores {
    pub proposals: Arc<dyn ProposalStore>,
    pub runs: Arc<dyn RunStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
}

impl Stores {
    /// Every collaborator backed by one SQLite store.
    pub fn sqlite(store: Arc<SqliteStore>) -> Self {
        Self {
            proposals: store.clone(),
            runs: store.clone(),
            identities: store.clone(),
            knowledge_base: store,
        }
    }
}

/// The Risk Gate engine.
///
/// Cheap to clone; holds no per-evaluation state.
#[derive(Clone)]
pub struct RiskGateService {
    stores: Stores,
    adapter: AiFindingsAdapter,
    overrides: OverrideController,
    config: RiskGateConfig,
}

impl RiskGateService {
    /// Create a service. `provider = None` runs every evaluation in degraded
    /// mode (synthetic `analysis_error` finding).
    pub fn new(
        stores: Stores,
        provider: Option<Arc<dyn FindingsProvider>>,
        config: RiskGateConfig,
    ) -> Result<Self> {
        config.validate()?;

        let adapter = AiFindingsAdapter::new(provider, config.ai.timeout());
        let overrides = OverrideController::new(
            stores.runs.clone(),
            stores.identities.clone(),
            config.auth.clone(),
        );

        info!(
            ai_configured = adapter.is_configured(),
            timeout_ms = config.ai.timeout_ms,
            "RiskGateService initialized"
        );

        Ok(Self {
            stores,
            adapter,
            overrides,
            config,
        })
    }

    pub fn config(&self) -> &RiskGateConfig {
        &self.config
    }

    /// Evaluate a proposal and persist the decision.
    ///
    /// The evaluation runs on its own task and completes even if the caller
    /// stops waiting.
    pub async fn analyze(&self, proposal_id: i64, requested_by: &str) -> Result<AnalyzeOutcome> {
        if proposal_id <= 0 {
            return Err(RiskGateError::missing("proposal_id"));
        }

        let service = self.clone();
        let requested_by = requested_by.to_string();
        let evaluation_id = Uuid::new_v4();

        let handle = tokio::spawn(async move {
            service
                .evaluate(evaluation_id, proposal_id, &requested_by)
                .await
        });

        let result = handle.await.map_err(|e| {
            RiskGateError::Internal(format!("Evaluation task failed: {}", e))
        })?;

        if let Err(ref err) = result {
            if err.status_code() >= 500 {
                error!(
                    evaluation_id = %evaluation_id,
                    proposal_id,
                    error = %err,
                    "Risk Gate evaluation failed"
                );
            }
        }
        result
    }

    async fn evaluate(
        &self,
        evaluation_id: Uuid,
        proposal_id: i64,
        requested_by: &str,
    ) -> Result<AnalyzeOutcome> {
        let proposal = self
            .stores
            .proposals
            .get_proposal(proposal_id)
            .await?
            .ok_or(RiskGateError::NotFound {
                entity: "Proposal",
                id: proposal_id,
            })?;

        let payload = serde_json::to_value(&proposal)?;
        let sanitization = sanitize(&payload);
        let hash = payload_hash(&sanitization.sanitized);

        if sanitization.blocked {
            warn!(
                evaluation_id = %evaluation_id,
                proposal_id,
                reasons = ?sanitization.block_reasons,
                "Proposal contains sensitive data; AI analysis skipped"
            );
            return self
                .persist_hard_block(proposal_id, requested_by, sanitization.block_reasons, Some(hash))
                .await;
        }

        let thresholds = self.config.governance;
        let (ai_outcome, (precheck, governance)) = tokio::join!(
            self.adapter.assess(&sanitization.sanitized),
            async {
                let precheck = run_prechecks(&proposal);
                let governance = evaluate_governance(&governance_input(&proposal, None), &thresholds);
                (precheck, governance)
            }
        );

        debug!(
            evaluation_id = %evaluation_id,
            precheck_score = precheck.risk_score,
            precheck_findings = precheck.findings.len(),
            governance_score = governance.score,
            governance_blocked = governance.blocked,
            "Deterministic checks complete"
        );

        let ai = match ai_outcome {
            AdapterOutcome::Assessed(assessment) => assessment,
            AdapterOutcome::Degraded { assessment, reason } => {
                warn!(evaluation_id = %evaluation_id, reason = %reason, "Continuing with degraded AI assessment");
                assessment
            }
            AdapterOutcome::Blocked { reasons } => {
                return self
                    .persist_hard_block(proposal_id, requested_by, reasons, None)
                    .await;
            }
        };

        let mut combined = combine(&precheck, &ai);
        let risk_audit = RiskAudit::new(&precheck, &ai, &combined);
        combined.findings.extend(governance.as_findings());

        let status = map_to_status(combined.risk_score, &combined.findings);
        let risk_score = clamp_score(combined.risk_score);
        let kb_citations =
            build_citations(self.stores.knowledge_base.as_ref(), &combined.findings).await?;

        let run = self
            .stores
            .runs
            .insert_run(NewRiskGateRun {
                proposal_id,
                requested_by: requested_by.to_string(),
                status,
                risk_score,
                findings: combined.findings,
                kb_citations,
                redaction_summary: RedactionSummary {
                    blocked: false,
                    reasons: Vec::new(),
                    sanitized_payload_hash: Some(hash),
                },
                risk_audit: Some(risk_audit),
            })
            .await?;

        info!(
            evaluation_id = %evaluation_id,
            run_id = run.id,
            proposal_id,
            status = %run.status,
            risk_score = run.risk_score,
            risk_level = run.risk_audit.as_ref().map(|a| a.overall_risk_level.as_str()),
            combined_score = combined.risk_score,
            findings = run.findings.len(),
            citations = run.kb_citations.len(),
            "Risk Gate decision recorded"
        );

        Ok(run.into())
    }

    async fn persist_hard_block(
        &self,
        proposal_id: i64,
        requested_by: &str,
        reasons: Vec<String>,
        sanitized_payload_hash: Option<String>,
    ) -> Result<AnalyzeOutcome> {
        let run = self
            .stores
            .runs
            .insert_run(NewRiskGateRun {
                proposal_id,
                requested_by: requested_by.to_string(),
                status: GateStatus::Block,
                risk_score: HARD_BLOCK_SCORE,
                findings: Vec::new(),
                kb_citations: Vec::new(),
                redaction_summary: RedactionSummary {
                    blocked: true,
                    reasons,
                    sanitized_payload_hash,
                },
                risk_audit: None,
            })
            .await?;

        info!(run_id = run.id, proposal_id, "Risk Gate hard block recorded");
        Ok(run.into())
    }

    /// Override a run's decision.
    pub async fn override_run(&self, request: &OverrideRequest) -> Result<OverrideOutcome> {
        self.overrides.override_run(request).await
    }

    /// Aggregate the latest run of every proposal matching `filter`.
    pub async fn summary(&self, filter: &ProposalFilter) -> Result<SummaryReport> {
        let proposals = self.stores.proposals.list_proposals(filter).await?;
        let latest = try_join_all(
            proposals
                .iter()
                .map(|proposal| self.stores.runs.latest_run(proposal.id)),
        )
        .await?;

        let mut counts = StatusCounts::default();
        for run in &latest {
            match run.as_ref().map(|r| r.status) {
                Some(GateStatus::Pass) => counts.pass += 1,
                Some(GateStatus::Review) => counts.review += 1,
                Some(GateStatus::Block) => counts.block += 1,
                None => counts.none += 1,
            }
        }

        let overall_level = if counts.block > 0 {
            "BLOCK"
        } else if counts.review > 0 {
            "REVIEW"
        } else if counts.pass > 0 {
            "PASS"
        } else {
            "NONE"
        };

        let total_proposals = proposals.len() as u64;
        debug!(total_proposals, counts = ?counts, "Risk Gate summary computed");

        Ok(SummaryReport {
            overall_level: overall_level.to_string(),
            total_proposals,
            analyzed_proposals: total_proposals - counts.none,
            counts,
        })
    }

    /// Governance readiness of a stored proposal against its latest decision.
    pub async fn readiness(&self, proposal_id: i64) -> Result<GovernanceResult> {
        if proposal_id <= 0 {
            return Err(RiskGateError::missing("proposal_id"));
        }

        let proposal = self
            .stores
            .proposals
            .get_proposal(proposal_id)
            .await?
            .ok_or(RiskGateError::NotFound {
                entity: "Proposal",
                id: proposal_id,
            })?;
        let latest = self.stores.runs.latest_run(proposal_id).await?;

        let mut input = governance_input(&proposal, latest.as_ref().map(|r| r.status));
        input.risk_gate_overridden = latest.as_ref().map(|r| r.overridden).unwrap_or(false);

        let result = evaluate_governance(&input, &self.config.governance);
        info!(
            proposal_id,
            score = result.score,
            blocked = result.blocked,
            "Governance readiness evaluated"
        );
        Ok(result)
    }
}

fn governance_input(proposal: &Proposal, status: Option<GateStatus>) -> GovernanceInput<'_> {
    GovernanceInput {
        template_key: proposal.template_key.as_deref(),
        sections: proposal.sections.as_ref(),
        content: proposal.content.as_deref(),
        risk_gate_status: status,
        risk_gate_overridden: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BLOCK_REASON_RISK_GATE;
    use crate::types::RiskLevel;
    use serde_json::json;

    fn service() -> (Arc<SqliteStore>, RiskGateService) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service =
            RiskGateService::new(Stores::sqlite(store.clone()), None, RiskGateConfig::default())
                .unwrap();
        (store, service)
    }

    #[tokio::test]
    async fn test_analyze_validates_and_reports_missing_proposal() {
        let (_, service) = service();
        assert!(matches!(
            service.analyze(0, "ana").await,
            Err(RiskGateError::Validation { ref field }) if field == "proposal_id"
        ));
        assert!(matches!(
            service.analyze(404, "ana").await,
            Err(RiskGateError::NotFound { entity: "Proposal", id: 404 })
        ));
    }

    #[tokio::test]
    async fn test_degraded_evaluation_is_persisted() {
        let (store, service) = service();
        let id = store
            .insert_proposal(&Proposal {
                title: Some("Data platform".into()),
                client: Some("Acme".into()),
                content: Some("Scope and approach. ".repeat(30)),
                ..Default::default()
            })
            .unwrap();

        let outcome = service.analyze(id, "ana").await.unwrap();
        // missing email (+20, high) plus the degraded AI score (50)
        assert_eq!(outcome.risk_score, 70);
        assert_eq!(outcome.status, GateStatus::Block);
        assert!(outcome
            .findings
            .iter()
            .any(|f| f.category.as_str() == "analysis_error"));
        assert!(!outcome.redaction_summary.blocked);
        assert_eq!(
            outcome.redaction_summary.sanitized_payload_hash.as_ref().map(String::len),
            Some(64)
        );

        let audit = outcome.risk_audit.clone().unwrap();
        assert_eq!(audit.combined_score, 70);
        assert_eq!(audit.overall_risk_level, RiskLevel::High);
        assert!(!audit.can_release);
        assert_eq!(audit.ai_summary, "AI analysis unavailable; manual review required.");

        let stored = store.get_run(outcome.run_id).await.unwrap().unwrap();
        assert_eq!(stored.findings, outcome.findings);
        assert_eq!(stored.risk_audit, outcome.risk_audit);
    }

    #[tokio::test]
    async fn test_readiness_uses_latest_run() {
        let (store, service) = service();
        let id = store
            .insert_proposal(&Proposal {
                sections: Some(json!({
                    "Executive Summary": "a",
                    "Scope & Deliverables": "b",
                    "Methodology": "c",
                    "Assumptions": "d"
                })),
                ..Default::default()
            })
            .unwrap();

        let ready = service.readiness(id).await.unwrap();
        assert!(!ready.blocked);

        let outcome = service.analyze(id, "ana").await.unwrap();
        assert_eq!(outcome.status, GateStatus::Block);

        let ready = service.readiness(id).await.unwrap();
        assert_eq!(ready.block_reasons, vec![BLOCK_REASON_RISK_GATE]);
    }

    #[tokio::test]
    async fn test_summary_of_empty_store() {
        let (_, service) = service();
        let report = service.summary(&ProposalFilter::default()).await.unwrap();
        assert_eq!(report.overall_level, "NONE");
        assert_eq!(report.total_proposals, 0);
        assert_eq!(report.analyzed_proposals, 0);
    }
}
