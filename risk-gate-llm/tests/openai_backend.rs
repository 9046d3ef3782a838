//! OpenAI-compatible backend against a mock HTTP server.

use std::time::Duration;

use risk_gate_llm::{CompletionRequest, LlmBackend, LlmError, OpenAiBackend};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 7 }
    })
}

#[tokio::test]
async fn test_complete_parses_choice_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(r#"{"risk_score": 5}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(
        format!("{}/v1", server.uri()),
        "gpt-test",
        Some("test-key".to_string()),
    )
    .unwrap();

    let response = backend
        .complete(CompletionRequest::new("hello").with_json_output())
        .await
        .unwrap();

    assert_eq!(response.content, r#"{"risk_score": 5}"#);
    assert!(!response.truncated);
    assert_eq!(response.usage.total(), 19);
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(format!("{}/v1", server.uri()), "gpt-test", None).unwrap();
    let result = backend.complete(CompletionRequest::new("hello")).await;

    match result {
        Err(LlmError::RateLimited { retry_after_ms }) => assert_eq!(retry_after_ms, Some(2000)),
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(format!("{}/v1", server.uri()), "gpt-test", None).unwrap();
    let result = backend.complete(CompletionRequest::new("hello")).await;

    assert!(matches!(result, Err(LlmError::RequestFailed(msg)) if msg.contains("overloaded")));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("{}"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let backend =
        OpenAiBackend::with_timeout(format!("{}/v1", server.uri()), "gpt-test", None, 50).unwrap();
    let result = backend.complete(CompletionRequest::new("hello")).await;

    assert!(matches!(result, Err(LlmError::Timeout(50))));
}

#[tokio::test]
async fn test_empty_choices_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(format!("{}/v1", server.uri()), "gpt-test", None).unwrap();
    let result = backend.complete(CompletionRequest::new("hello")).await;

    assert!(matches!(result, Err(LlmError::ParseError(_))));
}

#[tokio::test]
async fn test_length_stop_is_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"risk_score\": 4" },
                "finish_reason": "length"
            }]
        })))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(format!("{}/v1", server.uri()), "gpt-test", None).unwrap();
    let response = backend.complete(CompletionRequest::new("hello")).await.unwrap();

    assert!(response.truncated);
    assert_eq!(response.usage.total(), 0);
}
