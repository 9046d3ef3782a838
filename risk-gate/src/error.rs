//! Error taxonomy for the decision engine.

/// Errors surfaced by Risk Gate operations.
#[derive(Debug, thiserror::Error)]
pub enum RiskGateError {
    /// Missing or invalid required input
    #[error("{field} is required")]
    Validation { field: String },

    /// Sanitizer hard-blocked an outbound payload
    #[error("Blocked outbound AI request due to sensitive data detected: {}", reasons.join(", "))]
    Safety { reasons: Vec<String> },

    /// Actor may not perform the action
    #[error("Not authorized to override")]
    Forbidden,

    /// Unknown proposal or run
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// External AI provider failed (recovered inside the engine)
    #[error("AI adapter failure: {0}")]
    Adapter(String),

    /// Storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RiskGateError {
    /// Validation failure naming the missing field.
    pub fn missing(field: impl Into<String>) -> Self {
        RiskGateError::Validation {
            field: field.into(),
        }
    }

    /// HTTP-equivalent status for an outer transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            RiskGateError::Validation { .. } | RiskGateError::Safety { .. } => 400,
            RiskGateError::Forbidden => 403,
            RiskGateError::NotFound { .. } => 404,
            RiskGateError::Adapter(_) => 502,
            RiskGateError::Storage(_)
            | RiskGateError::Config(_)
            | RiskGateError::Internal(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for RiskGateError {
    fn from(err: rusqlite::Error) -> Self {
        RiskGateError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RiskGateError {
    fn from(err: serde_json::Error) -> Self {
        RiskGateError::Internal(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RiskGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_field() {
        let err = RiskGateError::missing("proposal_id");
        assert_eq!(err.to_string(), "proposal_id is required");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RiskGateError::Forbidden.status_code(), 403);
        assert_eq!(
            RiskGateError::NotFound {
                entity: "Risk Gate run",
                id: 7
            }
            .status_code(),
            404
        );
        assert_eq!(RiskGateError::Internal("x".into()).status_code(), 500);
    }
}
