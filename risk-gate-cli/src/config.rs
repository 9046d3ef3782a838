//! Configuration for the risk-gate CLI
//!
//! CLI arguments and environment variable handling using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Risk Gate - release decisions for proposal documents
#[derive(Parser, Debug, Clone)]
#[command(name = "risk-gate")]
#[command(about = "Evaluate, override and report Risk Gate decisions")]
pub struct Args {
    /// SQLite database holding proposals, runs and overrides
    #[arg(long, env = "RISK_GATE_DB", default_value = "risk-gate.db")]
    pub db: PathBuf,

    /// YAML policy file (governance thresholds, AI limits, auth mode)
    #[arg(long, env = "RISK_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// OpenAI-compatible endpoint; AI analysis is skipped when unset
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model name sent to the endpoint
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// API key for the endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed on the command line
#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Evaluate a proposal and record a decision
    Analyze {
        /// Proposal to evaluate
        #[arg(long)]
        proposal_id: i64,
        /// Actor requesting the evaluation
        #[arg(long, env = "RISK_GATE_ACTOR", default_value = "cli")]
        requested_by: String,
    },

    /// Override a recorded decision
    Override {
        #[arg(long)]
        run_id: i64,
        #[arg(long)]
        reason: String,
        /// Actor approving the override
        #[arg(long, env = "RISK_GATE_ACTOR")]
        actor: String,
        /// Role to assume when the actor has no stored role (development only)
        #[arg(long)]
        role_hint: Option<String>,
    },

    /// Aggregate the latest decision per proposal
    Summary {
        /// Restrict to these proposal ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<i64>>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        template_key: Option<String>,
    },

    /// Governance readiness of a proposal
    Readiness {
        #[arg(long)]
        proposal_id: i64,
    },

    /// Store a proposal from a JSON file
    ImportProposal {
        #[arg(long)]
        file: PathBuf,
    },

    /// Assign a role to an actor
    AddUser {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        role: String,
    },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_api_key.is_some() && self.llm_base_url.is_none() {
            return Err("LLM_API_KEY is set but LLM_BASE_URL is missing".to_string());
        }

        if self.llm_base_url.is_some() && self.llm_model.trim().is_empty() {
            return Err("LLM_MODEL must not be empty".to_string());
        }

        if let Command::AddUser { actor, role } = &self.command {
            if actor.trim().is_empty() || role.trim().is_empty() {
                return Err("actor and role must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Whether AI analysis is configured
    pub fn ai_enabled(&self) -> bool {
        self.llm_base_url.is_some()
    }
}
