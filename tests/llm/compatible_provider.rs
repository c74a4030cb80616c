use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatkeep::llm::{
    BackoffPolicy, CompletionGateway, CompletionProvider, FailureKind, GatewayConfig, ModelParams,
    OpenAiCompatibleProvider,
};
use chatkeep::session::{Message, SessionRegistry};
use chatkeep::store::Ttl;

fn params() -> ModelParams {
    ModelParams::new("glm-4")
}

fn ok_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    })
}

#[tokio::test]
async fn posts_transcript_and_reads_usage() {
    let server = MockServer::start().await;
    let expected_body = json!({
        "model": "glm-4",
        "messages": [
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hello"}
        ],
        "temperature": 0.9,
        "top_p": 0.7
    });

    Mock::given(method("POST"))
        .and(path("/v4/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("hi!")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new(
        "zhipuai",
        &format!("{}/v4/", server.uri()),
        Some("test-key"),
    );
    let messages = [Message::system("be brief"), Message::user("hello")];
    let completion = provider.complete(&messages, &params()).await.unwrap();

    assert_eq!(completion.content, "hi!");
    assert_eq!(completion.completion_tokens, 4);
    assert_eq!(completion.total_tokens, 16);
    server.verify().await;
}

async fn failure_kind_for(status: u16, body: &str) -> (FailureKind, String) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new("test", &server.uri(), Some("k"));
    let err = provider
        .complete(&[Message::user("hi")], &params())
        .await
        .unwrap_err();
    (err.kind, err.message)
}

#[tokio::test]
async fn status_codes_map_to_failure_kinds() {
    assert_eq!(failure_kind_for(429, "slow down").await.0, FailureKind::RateLimited);
    assert_eq!(failure_kind_for(503, "busy").await.0, FailureKind::ServiceUnavailable);
    assert_eq!(failure_kind_for(504, "").await.0, FailureKind::Timeout);
    assert_eq!(failure_kind_for(401, "bad key").await.0, FailureKind::Other);
}

#[tokio::test]
async fn long_error_bodies_are_shortened() {
    let body = format!("{{\"error\": \"{}\"}}", "x".repeat(1_000));
    let (kind, message) = failure_kind_for(400, &body).await;
    assert_eq!(kind, FailureKind::Other);
    assert!(message.contains("400"));
    assert!(message.ends_with("..."));
    assert!(message.len() < 400);
}

#[tokio::test]
async fn refused_connection_is_retryable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = OpenAiCompatibleProvider::new("test", &format!("http://{addr}"), Some("k"));
    let err = provider
        .complete(&[Message::user("hi")], &params())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::ConnectionFailed);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn gateway_retries_through_a_busy_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(OpenAiCompatibleProvider::new("test", &server.uri(), Some("k")));
    let registry = Arc::new(SessionRegistry::with_default_factory(Ttl::Never, "sys"));
    let config = GatewayConfig {
        backoff: BackoffPolicy {
            rate_limited: Duration::ZERO,
            timeout: Duration::ZERO,
            service_unavailable: Duration::ZERO,
            connection_failed: Duration::ZERO,
        },
        ..GatewayConfig::default()
    };
    let gateway = CompletionGateway::new(provider, Arc::clone(&registry), params(), config);

    let session = registry.get_or_create(Some("u1"), None);
    session.lock().unwrap().append_user("hello");
    let completion = gateway.complete(&session, None).await;

    assert_eq!(completion.content, "recovered");
    assert!(!completion.is_degraded());
    server.verify().await;
}
