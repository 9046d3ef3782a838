//! Scripted backend for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::*;

/// Failure a [`MockBackend`] returns on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unavailable,
    RateLimited,
    /// Same shape as a provider 5xx
    ServerError,
    /// Answer cut off at the token limit
    Truncated,
}

/// Backend with a canned answer.
///
/// Counts calls and keeps the last request so tests can assert both that
/// the provider was never reached and exactly what it would have seen.
pub struct MockBackend {
    model_id: String,
    response: String,
    failure: Option<MockFailure>,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockBackend {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            response: r#"{"risk_score": 0, "findings": []}"#.to_string(),
            failure: None,
            delay: None,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.response = content.into();
        self
    }

    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt_tokens = request.estimated_prompt_tokens();
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let truncated = match self.failure {
            Some(MockFailure::Unavailable) => {
                return Err(LlmError::Unavailable("Mock backend failure".to_string()))
            }
            Some(MockFailure::RateLimited) => {
                return Err(LlmError::RateLimited {
                    retry_after_ms: Some(1000),
                })
            }
            Some(MockFailure::ServerError) => {
                return Err(LlmError::RequestFailed("HTTP 500: mock".to_string()))
            }
            Some(MockFailure::Truncated) => true,
            None => false,
        };

        let content: String = if truncated {
            self.response
                .chars()
                .take(self.response.chars().count() / 2)
                .collect()
        } else {
            self.response.clone()
        };

        Ok(CompletionResponse {
            usage: Usage {
                prompt_tokens,
                completion_tokens: u32::try_from(content.len() / 4).unwrap_or(u32::MAX),
            },
            content,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_answer_is_counted() {
        let backend = MockBackend::new("test-model").with_response(r#"{"risk_score": 12}"#);
        assert_eq!(backend.call_count(), 0);

        let response = backend
            .complete(CompletionRequest::new("Proposal: {}"))
            .await
            .unwrap();

        assert_eq!(response.content, r#"{"risk_score": 12}"#);
        assert!(!response.truncated);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_request().unwrap().prompt, "Proposal: {}");
    }

    #[tokio::test]
    async fn test_failure_modes_still_count() {
        let backend = MockBackend::default().with_failure(MockFailure::RateLimited);
        let result = backend.complete(CompletionRequest::new("x")).await;
        assert!(matches!(result, Err(LlmError::RateLimited { .. })));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_answer() {
        let backend = MockBackend::default()
            .with_response("0123456789")
            .with_failure(MockFailure::Truncated);
        let response = backend.complete(CompletionRequest::new("x")).await.unwrap();
        assert!(response.truncated);
        assert_eq!(response.content, "01234");
    }
}
