//! Risk Gate - release decision engine for proposal documents
//!
//! Evaluates a proposal before it may be released to a client and produces
//! an auditable PASS / REVIEW / BLOCK decision:
//! - Outbound sanitization with a hard-block short-circuit for sensitive data
//! - Deterministic prechecks and template governance scoring
//! - AI findings through a bounded, failure-tolerant adapter
//! - Knowledge-base citations for findings
//! - Authorized, idempotent overrides with an immutable audit trail
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    RiskGateService                      │
//! │        analyze · override_run · summary · readiness     │
//! └──────┬──────────────┬───────────────┬─────────────┬─────┘
//!        │              │               │             │
//!        ▼              ▼               ▼             ▼
//!  ┌───────────┐ ┌─────────────┐ ┌────────────┐ ┌───────────┐
//!  │ Sanitizer │ │ Precheck +  │ │ AI findings│ │ Override  │
//!  │           │ │ Governance  │ │ adapter    │ │ controller│
//!  └───────────┘ └─────────────┘ └─────┬──────┘ └─────┬─────┘
//!                       │              │              │
//!                       ▼              ▼              ▼
//!                 ┌──────────┐  ┌────────────┐  ┌───────────┐
//!                 │ Combiner │  │ LlmBackend │  │ RunStore  │
//!                 │ + cites  │  │ (external) │  │ (SQLite)  │
//!                 └──────────┘  └────────────┘  └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use risk_gate::{RiskGateConfig, RiskGateService, SqliteStore, Stores};
//!
//! let store = Arc::new(SqliteStore::open_in_memory()?);
//! let service = RiskGateService::new(Stores::sqlite(store), None, RiskGateConfig::default())?;
//! let outcome = service.analyze(42, "analyst").await?;
//! println!("{} ({})", outcome.status, outcome.risk_score);
//! ```

pub mod ai;
pub mod citations;
pub mod combiner;
pub mod config;
pub mod error;
pub mod governance;
pub mod overrides;
pub mod policy;
pub mod precheck;
pub mod sanitizer;
pub mod sections;
pub mod service;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use ai::{AdapterOutcome, AiAssessment, AiFindingsAdapter, FindingsProvider, LlmFindingsProvider};
pub use combiner::{combine, map_to_status};
pub use config::{AiConfig, AuthConfig, Environment, RiskGateConfig};
pub use error::{Result, RiskGateError};
pub use governance::{evaluate_governance, GovernanceInput, GovernanceResult, GovernanceThresholds};
pub use overrides::{OverrideController, OverrideRequest};
pub use precheck::run_prechecks;
pub use sanitizer::{enforce_safe, payload_hash, sanitize, SanitizationResult, Sanitizer};
pub use service::{RiskGateService, Stores};
pub use store::{IdentityStore, KnowledgeBase, OverrideApplied, ProposalStore, RunStore, SqliteStore};
pub use types::*;
