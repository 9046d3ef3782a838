//! Configuration for the Risk Gate engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, RiskGateError};
use crate::governance::GovernanceThresholds;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskGateConfig {
    /// Governance thresholds
    pub governance: GovernanceThresholds,
    /// AI provider call settings
    pub ai: AiConfig,
    /// Override authorization settings
    pub auth: AuthConfig,
}

impl RiskGateConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RiskGateError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&raw)
            .map_err(|e| RiskGateError::Config(format!("Invalid YAML in {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.auth.allow_dev_role_hint && self.auth.environment != Environment::Development {
            return Err(RiskGateError::Config(
                "allow_dev_role_hint requires environment = development".to_string(),
            ));
        }
        if self.governance.pass_threshold > 100 {
            return Err(RiskGateError::Config(format!(
                "governance.pass_threshold must be 0..=100, got {}",
                self.governance.pass_threshold
            )));
        }
        if self.ai.timeout_ms == 0 {
            return Err(RiskGateError::Config("ai.timeout_ms must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(RiskGateError::Config(format!(
                "ai.temperature must be 0.0..=2.0, got {}",
                self.ai.temperature
            )));
        }
        Ok(())
    }
}

/// AI provider call settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Upper bound on one provider call (ms)
    pub timeout_ms: u64,
    /// Completion token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// Override authorization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub environment: Environment,
    /// Accept a caller-supplied role when the actor has none (development only)
    pub allow_dev_role_hint: bool,
}

impl AuthConfig {
    /// Both switches must be on for a role hint to be read.
    pub fn role_hint_enabled(&self) -> bool {
        self.environment == Environment::Development && self.allow_dev_role_hint
    }
}
