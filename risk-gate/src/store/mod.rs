//! Persistence collaborators.
//!
//! The engine talks to storage only through these traits. [`SqliteStore`]
//! implements all of them on a single SQLite database.
//!
//! ## Tables
//!
//! - `proposals` - proposal documents (sections stored as JSON text)
//! - `users` - actor to role mapping for override authorization
//! - `kb_documents` / `kb_clauses` - read-only policy clauses
//! - `risk_gate_runs` - append-only evaluation records
//! - `risk_gate_overrides` - one audit row per overridden run

pub mod schema;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    KnowledgeBaseClause, NewRiskGateRun, OverrideRecord, Proposal, ProposalFilter, RiskGateRun,
};

pub use sqlite::SqliteStore;

/// Result of an atomic override attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideApplied {
    /// This call flipped the run and wrote the audit row
    Applied(OverrideRecord),
    /// The run was already overridden; the original record is returned
    AlreadyOverridden(OverrideRecord),
}

impl OverrideApplied {
    pub fn record(&self) -> &OverrideRecord {
        match self {
            OverrideApplied::Applied(record) | OverrideApplied::AlreadyOverridden(record) => record,
        }
    }

    pub fn into_record(self) -> OverrideRecord {
        match self {
            OverrideApplied::Applied(record) | OverrideApplied::AlreadyOverridden(record) => record,
        }
    }

    pub fn was_already_overridden(&self) -> bool {
        matches!(self, OverrideApplied::AlreadyOverridden(_))
    }
}

/// Read access to proposals.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn get_proposal(&self, proposal_id: i64) -> Result<Option<Proposal>>;

    /// Proposals matching a filter, ordered by id.
    async fn list_proposals(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>>;
}

/// Risk Gate run persistence and override audit.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn insert_run(&self, run: NewRiskGateRun) -> Result<RiskGateRun>;

    async fn get_run(&self, run_id: i64) -> Result<Option<RiskGateRun>>;

    /// Most recent run for a proposal by `created_at`, then id.
    async fn latest_run(&self, proposal_id: i64) -> Result<Option<RiskGateRun>>;

    /// Flip `overridden` and write the audit row atomically.
    ///
    /// At most one audit row ever exists per run. Fails with `NotFound` if
    /// the run does not exist.
    async fn apply_override(&self, run_id: i64, reason: &str, actor: &str)
        -> Result<OverrideApplied>;

    async fn get_override(&self, run_id: i64) -> Result<Option<OverrideRecord>>;

    async fn count_overrides(&self, run_id: i64) -> Result<u64>;
}

/// Resolves an actor's role.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn resolve_role(&self, actor: &str) -> Result<Option<String>>;
}

/// Read-only policy clause lookup.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Clauses whose key is in `clause_keys`, ordered by clause id.
    async fn lookup_clauses(&self, clause_keys: &[&str]) -> Result<Vec<KnowledgeBaseClause>>;
}
