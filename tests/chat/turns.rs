use std::sync::Arc;
use std::time::Duration;

use chatkeep::chat::{ChatService, Reply, TurnRequest};
use chatkeep::config::{Config, ConfigHandle};
use chatkeep::llm::{Completion, DEFAULT_APOLOGY, FailureKind};
use chatkeep::session::MessageRole;
use tokio_util::sync::CancellationToken;

use crate::scripted_provider::{ScriptedProvider, failure};

fn service(config: Config, provider: &Arc<ScriptedProvider>) -> ChatService {
    ChatService::from_config(
        ConfigHandle::new(config),
        provider.clone(),
        CancellationToken::new(),
    )
}

fn contents(messages: &[chatkeep::session::Message]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn follow_up_turn_carries_history() {
    let provider = Arc::new(ScriptedProvider::answering("pong", 40));
    let service = service(Config::default(), &provider);

    assert_eq!(
        service.handle_turn(Some("u1"), "ping", None).await,
        Reply::Text("pong".into())
    );
    service.handle_turn(Some("u1"), "again", None).await;

    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent)[1..], ["ping", "pong", "again"]);
    assert_eq!(sent[0].role, MessageRole::System);
}

#[tokio::test]
async fn system_prompt_override_restarts_conversation() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 40));
    let service = service(Config::default(), &provider);

    service.handle_turn(Some("u1"), "first", None).await;
    let before = service.registry().get_or_create(Some("u1"), None);

    service
        .handle_turn(Some("u1"), "second", Some("You are a pirate."))
        .await;

    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent), ["You are a pirate.", "second"]);

    let after = service.registry().get_or_create(Some("u1"), None);
    assert!(Arc::ptr_eq(&before, &after), "reset happens in place");
    assert_eq!(after.lock().unwrap().system_prompt(), "You are a pirate.");
}

#[tokio::test]
async fn anonymous_turns_are_not_remembered() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 40));
    let service = service(Config::default(), &provider);

    service.handle_turn(None, "one", None).await;
    service.handle_turn(None, "two", None).await;

    assert!(service.registry().is_empty());
    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent)[1..], ["two"]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_after_backoff() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![failure(FailureKind::Timeout), failure(FailureKind::Timeout)],
        Completion::new("finally", 2, 30),
    ));
    let service = service(Config::default(), &provider);

    let start = tokio::time::Instant::now();
    let reply = service.handle_turn(Some("u1"), "hello", None).await;

    assert_eq!(reply, Reply::Text("finally".into()));
    assert_eq!(provider.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_apologize_and_keep_history() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![
            failure(FailureKind::RateLimited),
            failure(FailureKind::RateLimited),
            failure(FailureKind::RateLimited),
        ],
        Completion::new("unused", 1, 1),
    ));
    let service = service(Config::default(), &provider);

    let reply = service.handle_turn(Some("u1"), "hello", None).await;
    assert_eq!(reply, Reply::Error(DEFAULT_APOLOGY.into()));
    assert_eq!(provider.calls(), 3);

    let session = service.registry().get_or_create(Some("u1"), None);
    assert_eq!(contents(session.lock().unwrap().messages())[1..], ["hello"]);
}

#[tokio::test]
async fn unclassified_failure_discards_conversation() {
    let provider = Arc::new(ScriptedProvider::new(
        vec![failure(FailureKind::Other)],
        Completion::new("fresh", 1, 20),
    ));
    let mut config = Config::default();
    config.reliability.apology = "Try again soon.".into();
    let service = service(config, &provider);

    let reply = service.handle_turn(Some("u1"), "hello", None).await;
    assert_eq!(reply, Reply::Error("Try again soon.".into()));
    assert_eq!(provider.calls(), 1);
    assert!(!service.registry().contains("u1"));

    service.handle_turn(Some("u1"), "retry", None).await;
    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent)[1..], ["retry"]);
}

#[tokio::test]
async fn reported_usage_over_budget_trims_history() {
    let provider = Arc::new(ScriptedProvider::answering("long answer", 5_000));
    let mut config = Config::default();
    config.session.max_context_tokens = 100;
    let service = service(config, &provider);

    service.handle_turn(Some("u1"), "first", None).await;
    service.handle_turn(Some("u1"), "second", None).await;

    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent)[1..], ["second"]);
    let session = service.registry().get_or_create(Some("u1"), None);
    assert_eq!(session.lock().unwrap().messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_conversations_expire() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 40));
    let mut config = Config::default();
    config.session.idle_expiry_secs = Some(60);
    let service = service(config, &provider);

    service.handle_turn(Some("u1"), "hello", None).await;
    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(service.registry().contains("u1"));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!service.registry().contains("u1"));

    service.handle_turn(Some("u1"), "back", None).await;
    let (sent, _) = provider.last_request();
    assert_eq!(contents(&sent)[1..], ["back"]);
}

#[tokio::test]
async fn model_override_applies_to_one_turn() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 40));
    let service = service(Config::default(), &provider);

    service
        .handle(TurnRequest::new("hi").conversation("u1").model("glm-4-air"))
        .await;
    assert_eq!(provider.last_request().1, "glm-4-air");

    service.handle(TurnRequest::new("hi").conversation("u1")).await;
    assert_eq!(provider.last_request().1, "glm-4");
}

#[tokio::test]
async fn clear_conversation_only_touches_that_id() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 40));
    let service = service(Config::default(), &provider);
    service.handle_turn(Some("a"), "x", None).await;
    service.handle_turn(Some("b"), "y", None).await;

    service.clear_conversation("a");
    assert!(!service.registry().contains("a"));
    assert!(service.registry().contains("b"));

    service.clear_all();
    assert!(service.registry().is_empty());
}
