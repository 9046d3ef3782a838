//! The findings-provider wire boundary.
//!
//! Risk Gate sends exactly one prompt per evaluation and expects one JSON
//! object back, so a request is a system prompt plus a single user prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Failures talking to a provider. The engine degrades on all of them.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Non-success HTTP status other than 429
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider answered but the envelope was unreadable
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A completion provider.
///
/// Shared behind an `Arc` by concurrent evaluations.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model identifier, used in logs.
    fn id(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// One-shot completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    /// 0.0..=2.0
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Out-of-range values are clamped.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Rough prompt size in tokens (4 bytes per token).
    pub fn estimated_prompt_tokens(&self) -> u32 {
        let system = self.system_prompt.as_deref().map(str::len).unwrap_or(0);
        u32::try_from((system + self.prompt.len()) / 4).unwrap_or(u32::MAX)
    }
}

/// Provider answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CompletionResponse {
    pub content: String,
    /// Generation stopped at the token limit; JSON output is likely cut off
    pub truncated: bool,
    pub usage: Usage,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("review this")
            .with_system("You are a reviewer")
            .with_max_tokens(512)
            .with_temperature(5.0)
            .with_json_output();

        assert_eq!(request.prompt, "review this");
        assert_eq!(request.system_prompt.as_deref(), Some("You are a reviewer"));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.temperature, Some(2.0));
        assert!(request.json_output);
    }

    #[test]
    fn test_estimated_prompt_tokens() {
        let request = CompletionRequest::new("a".repeat(40)).with_system("b".repeat(40));
        assert_eq!(request.estimated_prompt_tokens(), 20);
    }
}
