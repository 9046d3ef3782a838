//! Override and audit controller.
//!
//! A run moves from evaluated to overridden at most once. The transition is
//! authorized against the role allow-list, requires a reason, and is written
//! through [`RunStore::apply_override`] so the run flag and the audit row land
//! together. Repeating an override returns the original record.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{Result, RiskGateError};
use crate::policy::OVERRIDE_ROLES;
use crate::store::{IdentityStore, RunStore};
use crate::types::OverrideOutcome;

/// Caller-supplied override request.
#[derive(Debug, Clone, Default)]
pub struct OverrideRequest {
    pub run_id: i64,
    pub reason: String,
    pub actor: String,
    /// Role asserted out-of-band; honored only when development hints are enabled
    pub role_hint: Option<String>,
}

/// Whether a role may override decisions (case-insensitive).
pub fn is_override_authorized(role: Option<&str>) -> bool {
    role.map(|r| r.trim().to_lowercase())
        .map(|r| OVERRIDE_ROLES.contains(&r.as_str()))
        .unwrap_or(false)
}

/// Applies authorized, idempotent overrides.
#[derive(Clone)]
pub struct OverrideController {
    runs: Arc<dyn RunStore>,
    identities: Arc<dyn IdentityStore>,
    auth: AuthConfig,
}

impl OverrideController {
    pub fn new(runs: Arc<dyn RunStore>, identities: Arc<dyn IdentityStore>, auth: AuthConfig) -> Self {
        Self {
            runs,
            identities,
            auth,
        }
    }

    /// Resolve the actor's role, falling back to the hint only in development.
    pub async fn resolve_role(&self, actor: &str, role_hint: Option<&str>) -> Result<Option<String>> {
        if let Some(role) = self.identities.resolve_role(actor).await? {
            return Ok(Some(role));
        }

        let hint = role_hint.map(str::trim).filter(|h| !h.is_empty());
        match hint {
            Some(hint) if self.auth.role_hint_enabled() => {
                warn!(actor = %actor, role = %hint, "Using development role hint");
                Ok(Some(hint.to_string()))
            }
            Some(_) => {
                warn!(actor = %actor, "Ignoring role hint outside development mode");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Override a run.
    ///
    /// Checks run in order: run id, authorization, reason, existence. An
    /// unauthorized caller therefore learns nothing about the run.
    pub async fn override_run(&self, request: &OverrideRequest) -> Result<OverrideOutcome> {
        if request.run_id <= 0 {
            return Err(RiskGateError::missing("run_id"));
        }

        let actor = request.actor.trim();
        let role = if actor.is_empty() {
            None
        } else {
            self.resolve_role(actor, request.role_hint.as_deref()).await?
        };
        if !is_override_authorized(role.as_deref()) {
            warn!(run_id = request.run_id, actor = %actor, "Override rejected: not authorized");
            return Err(RiskGateError::Forbidden);
        }

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(RiskGateError::missing("override_reason"));
        }

        let run = self
            .runs
            .get_run(request.run_id)
            .await?
            .ok_or(RiskGateError::NotFound {
                entity: "Risk Gate run",
                id: request.run_id,
            })?;

        let applied = self.runs.apply_override(run.id, reason, actor).await?;
        let already_overridden = applied.was_already_overridden();
        let record = applied.into_record();

        if already_overridden {
            info!(
                run_id = run.id,
                override_id = record.id,
                "Run already overridden; returning existing record"
            );
        } else {
            info!(
                run_id = run.id,
                proposal_id = run.proposal_id,
                override_id = record.id,
                approved_by = %record.approved_by,
                previous_status = %run.status,
                "Run overridden"
            );
        }

        Ok(OverrideOutcome {
            run_id: run.id,
            proposal_id: run.proposal_id,
            overridden: true,
            already_overridden,
            override_record: record,
        })
    }
}
