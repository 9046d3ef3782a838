//! Command execution.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;

use risk_gate::{
    FindingsProvider, LlmFindingsProvider, OverrideRequest, Proposal, ProposalFilter,
    RiskGateConfig, RiskGateService, SqliteStore, Stores,
};
use risk_gate_llm::OpenAiBackend;

use crate::config::{Args, Command};

/// Load the policy file (or defaults) named by the arguments.
pub fn load_config(args: &Args) -> anyhow::Result<RiskGateConfig> {
    match &args.config {
        Some(path) => RiskGateConfig::load(path)
            .with_context(|| format!("Failed to load policy file {}", path.display())),
        None => Ok(RiskGateConfig::default()),
    }
}

/// Build the service over `store`, attaching an AI provider when configured.
pub fn build_service(
    args: &Args,
    config: RiskGateConfig,
    store: Arc<SqliteStore>,
) -> anyhow::Result<RiskGateService> {
    let provider: Option<Arc<dyn FindingsProvider>> = match &args.llm_base_url {
        Some(base_url) => {
            let backend = OpenAiBackend::with_timeout(
                base_url.clone(),
                args.llm_model.clone(),
                args.llm_api_key.clone(),
                config.ai.timeout_ms,
            )
            .context("Failed to create LLM backend")?;
            info!(model = %args.llm_model, "AI analysis enabled");
            let provider: Arc<dyn FindingsProvider> =
                Arc::new(LlmFindingsProvider::new(Arc::new(backend), &config.ai));
            Some(provider)
        }
        None => {
            info!("No LLM_BASE_URL configured; AI analysis will be reported as unavailable");
            None
        }
    };

    Ok(RiskGateService::new(Stores::sqlite(store), provider, config)?)
}

/// Run one command and return its JSON result.
pub async fn execute(
    command: &Command,
    service: &RiskGateService,
    store: &SqliteStore,
) -> anyhow::Result<Value> {
    let output = match command {
        Command::Analyze {
            proposal_id,
            requested_by,
        } => serde_json::to_value(service.analyze(*proposal_id, requested_by).await?)?,

        Command::Override {
            run_id,
            reason,
            actor,
            role_hint,
        } => {
            let request = OverrideRequest {
                run_id: *run_id,
                reason: reason.clone(),
                actor: actor.clone(),
                role_hint: role_hint.clone(),
            };
            serde_json::to_value(service.override_run(&request).await?)?
        }

        Command::Summary {
            ids,
            owner,
            template_key,
        } => {
            let filter = ProposalFilter {
                proposal_ids: ids.clone(),
                owner: owner.clone(),
                template_key: template_key.clone(),
            };
            serde_json::to_value(service.summary(&filter).await?)?
        }

        Command::Readiness { proposal_id } => {
            let result = service.readiness(*proposal_id).await?;
            json!({
                "proposal_id": proposal_id,
                "score": result.score,
                "blocked": result.blocked,
                "block_reasons": result.block_reasons,
                "issues": result.issues,
                "required_sections": result.required_sections,
                "missing_required": result.missing_required,
                "missing_optional": result.missing_optional,
            })
        }

        Command::ImportProposal { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let proposal: Proposal =
                serde_json::from_str(&raw).context("Proposal file is not valid JSON")?;
            let id = store.insert_proposal(&proposal)?;
            info!(proposal_id = id, "Proposal imported");
            json!({ "proposal_id": id })
        }

        Command::AddUser { actor, role } => {
            store.upsert_user(actor.trim(), role.trim())?;
            json!({ "actor": actor.trim(), "role": role.trim() })
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["risk-gate", "--db", ":memory:"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_import_then_analyze_without_ai() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("proposal.json");
        std::fs::write(
            &file,
            r#"{"title": "Pilot", "client": "Acme", "client_email": "bids@acme", "content": "short"}"#,
        )
        .unwrap();

        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let parsed = args(&["import-proposal", "--file", file.to_str().unwrap()]);
        let service =
            build_service(&parsed, RiskGateConfig::default(), store.clone()).unwrap();

        let imported = execute(&parsed.command, &service, &store).await.unwrap();
        let proposal_id = imported["proposal_id"].as_i64().unwrap();

        let analyze = Command::Analyze {
            proposal_id,
            requested_by: "cli".into(),
        };
        let outcome = execute(&analyze, &service, &store).await.unwrap();
        // insufficient content (25, high) plus unavailable AI (50)
        assert_eq!(outcome["risk_score"], 75);
        assert_eq!(outcome["status"], "BLOCK");
        assert_eq!(outcome["findings"][0]["category"], "insufficient_content");
    }

    #[tokio::test]
    async fn test_add_user_enables_override() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let parsed = args(&["add-user", "--actor", " ops ", "--role", "Admin"]);
        let service =
            build_service(&parsed, RiskGateConfig::default(), store.clone()).unwrap();

        let added = execute(&parsed.command, &service, &store).await.unwrap();
        assert_eq!(added["actor"], "ops");

        let proposal_id = store.insert_proposal(&Proposal::default()).unwrap();
        let outcome = execute(
            &Command::Analyze {
                proposal_id,
                requested_by: "ops".into(),
            },
            &service,
            &store,
        )
        .await
        .unwrap();
        let run_id = outcome["run_id"].as_i64().unwrap();

        let overridden = execute(
            &Command::Override {
                run_id,
                reason: "Accepted".into(),
                actor: "ops".into(),
                role_hint: None,
            },
            &service,
            &store,
        )
        .await
        .unwrap();
        assert_eq!(overridden["overridden"], true);
        assert_eq!(overridden["override"]["approved_by"], "ops");
    }

    #[tokio::test]
    async fn test_unknown_proposal_is_an_error() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let parsed = args(&["readiness", "--proposal-id", "42"]);
        let service =
            build_service(&parsed, RiskGateConfig::default(), store.clone()).unwrap();

        let err = execute(&parsed.command, &service, &store).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
