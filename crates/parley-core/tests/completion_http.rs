use std::time::Duration;

use parley_core::{CompletionClient, CompletionError, CompletionService, CompletionSettings, Role, WireMessage};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

fn settings_for(server: &MockServer) -> CompletionSettings {
    CompletionSettings {
        endpoint: format!("{}{}", server.uri(), COMPLETIONS_PATH),
        model: "test/model".to_string(),
        api_key: Some("sk-test".to_string()),
        referer: "https://parley.test".to_string(),
        title: "Parley Test".to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn history() -> Vec<WireMessage> {
    vec![
        WireMessage { role: Role::Assistant, content: "Hello!".to_string() },
        WireMessage { role: Role::User, content: "2+2?".to_string() },
    ]
}

#[tokio::test]
async fn test_sends_contract_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("HTTP-Referer", "https://parley.test"))
        .and(header("X-Title", "Parley Test"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "model": "test/model",
            "messages": [
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "2+2?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "4"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(settings_for(&server)).unwrap();
    let reply = client.complete(&history()).await.unwrap();
    assert_eq!(reply.as_deref(), Some("4"));
}

#[tokio::test]
async fn test_no_credential_sends_no_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let settings = CompletionSettings {
        api_key: None,
        ..settings_for(&server)
    };
    let client = CompletionClient::new(settings).unwrap();
    client.complete(&history()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_server_error_is_status_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = CompletionClient::new(settings_for(&server)).unwrap();
    match client.complete(&history()).await {
        Err(CompletionError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_status_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "No auth"}})))
        .mount(&server)
        .await;

    let client = CompletionClient::new(settings_for(&server)).unwrap();
    let result = client.complete(&history()).await;
    assert!(matches!(result, Err(CompletionError::Status { status, .. }) if status.as_u16() == 401));
}

#[tokio::test]
async fn test_non_json_body_is_decode_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = CompletionClient::new(settings_for(&server)).unwrap();
    let result = client.complete(&history()).await;
    assert!(matches!(result, Err(CompletionError::Decode(_))));
}

#[tokio::test]
async fn test_missing_choices_is_empty_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gen-2"})))
        .mount(&server)
        .await;

    let client = CompletionClient::new(settings_for(&server)).unwrap();
    assert_eq!(client.complete(&history()).await.unwrap(), None);
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = CompletionSettings {
        timeout: Duration::from_millis(200),
        ..settings_for(&server)
    };
    let client = CompletionClient::new(settings).unwrap();
    match client.complete(&history()).await {
        Err(CompletionError::Transport(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
}
