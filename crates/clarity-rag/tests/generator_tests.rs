use std::time::Duration;

use clarity_core::traits::AnswerGenerator;
use clarity_core::{BackendFailure, Error};
use clarity_rag::ChatCompletionsGenerator;
use mockito::Matcher;
use serde_json::json;

fn completion(text: &str) -> String {
    json!({ "id": "cmpl-1", "choices": [ { "index": 0, "message": { "role": "assistant", "content": text } } ] }).to_string()
}

/// Accepts connections and never answers, so only the client deadline ends a request.
async fn silent_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn sends_single_user_message_and_returns_text_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer ollama")
        .match_body(Matcher::Json(json!({
            "model": "phi3",
            "messages": [ { "role": "user", "content": "translate this" } ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("  Schedule a planning meeting.\n"))
        .create_async()
        .await;

    let generator = ChatCompletionsGenerator::local("phi3").with_base_url(&server.url());
    let answer = generator.generate("translate this").await.unwrap();
    mock.assert_async().await;
    assert_eq!(answer, "  Schedule a planning meeting.\n");
    assert_eq!(generator.model(), "phi3");
}

#[tokio::test]
async fn hosted_backend_uses_the_given_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(completion("ok"))
        .create_async()
        .await;
    let generator = ChatCompletionsGenerator::hosted("sk-test", "gpt-4o-mini").with_base_url(&server.url());
    assert_eq!(generator.generate("hi").await.unwrap(), "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn auth_failure_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(json!({ "error": { "message": "Incorrect API key provided" } }).to_string())
        .create_async()
        .await;
    let generator = ChatCompletionsGenerator::hosted("sk-bad", "gpt-4o-mini").with_base_url(&server.url());
    let err = generator.generate("hi").await.unwrap_err();
    match &err {
        Error::GenerationBackend { kind: BackendFailure::Rejected, message } => assert!(message.contains("Incorrect API key")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!err.is_retryable());
    assert!(err.user_message().contains("API key"));
}

#[tokio::test]
async fn unreachable_server_is_distinguished() {
    let generator = ChatCompletionsGenerator::local("phi3").with_base_url("http://127.0.0.1:9/v1");
    let err = generator.generate("hi").await.unwrap_err();
    assert!(matches!(err, Error::GenerationBackend { kind: BackendFailure::Unreachable, .. }), "got {err:?}");
    assert!(err.is_retryable());
    assert!(err.user_message().contains("container"));
}

#[tokio::test]
async fn reply_without_choices_is_invalid() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;
    let generator = ChatCompletionsGenerator::local("phi3").with_base_url(&server.url());
    let err = generator.generate("hi").await.unwrap_err();
    assert!(matches!(err, Error::GenerationBackend { kind: BackendFailure::InvalidResponse, .. }));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let generator = ChatCompletionsGenerator::local("phi3")
        .with_base_url(&silent_backend().await)
        .with_deadline(Duration::from_millis(200));
    let err = generator.generate("translate this").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { operation: "generation", .. }), "got {err:?}");
    assert!(err.is_retryable());
}
