use std::fs;
use std::sync::Arc;

use chatkeep::chat::{ChatService, Reply};
use chatkeep::config::{Config, ConfigHandle};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use crate::env_guard::clean_env;
use crate::scripted_provider::ScriptedProvider;

fn service_from_file(path: &std::path::Path, provider: &Arc<ScriptedProvider>) -> ChatService {
    let config = assert_ok!(Config::from_file(path));
    ChatService::from_config(
        ConfigHandle::new(config),
        provider.clone(),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn reload_command_swaps_in_new_command_words() {
    let _env = clean_env().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[commands]\nclear_all = \"#clear_all\"\n").unwrap();

    let provider = Arc::new(ScriptedProvider::answering("ok", 10));
    let service = service_from_file(&path, &provider);
    service.handle_turn(Some("u1"), "hello", None).await;

    fs::write(&path, "[commands]\nclear_all = \"#forget_everyone\"\n").unwrap();
    assert_eq!(
        service.handle_turn(Some("u1"), "#reload_config", None).await,
        Reply::Info("Config reloaded".into())
    );

    let reply = service.handle_turn(Some("u1"), "#forget_everyone", None).await;
    assert_eq!(reply, Reply::Info("All memories cleared".into()));
    assert!(service.registry().is_empty());
    assert_eq!(provider.calls(), 1);

    // The old word is an ordinary message now.
    let reply = service.handle_turn(Some("u1"), "#clear_all", None).await;
    assert_eq!(reply, Reply::Text("ok".into()));
}

#[tokio::test]
async fn rejected_reload_keeps_running_config() {
    let _env = clean_env().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    let provider = Arc::new(ScriptedProvider::answering("ok", 10));
    let service = service_from_file(&path, &provider);

    fs::write(&path, "[provider]\ntop_p = 1.0\n").unwrap();
    assert_err!(Config::from_file(&path));

    let reply = service.handle_turn(None, "#reload_config", None).await;
    match reply {
        Reply::Error(message) => assert!(message.starts_with("Config reload failed")),
        other => panic!("expected an error reply, got {other:?}"),
    }
    assert!((service.config().load().provider.top_p - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn clear_command_without_conversation_is_acknowledged() {
    let provider = Arc::new(ScriptedProvider::answering("ok", 10));
    let service = ChatService::from_config(
        ConfigHandle::new(Config::default()),
        provider.clone(),
        CancellationToken::new(),
    );
    service.handle_turn(Some("u1"), "hello", None).await;

    let reply = service.handle_turn(None, "#clear", None).await;
    assert_eq!(reply, Reply::Info("Memory cleared".into()));
    assert!(service.registry().contains("u1"));
}

#[tokio::test]
async fn reload_reads_model_from_file_without_env_overrides() {
    let _env = clean_env().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[provider]\nmodel = \"glm-4-air\"\n").unwrap();

    let provider = Arc::new(ScriptedProvider::answering("ok", 10));
    let service = service_from_file(&path, &provider);
    assert_eq!(service.config().load().provider.model, "glm-4-air");

    fs::write(&path, "[provider]\nmodel = \"glm-4-plus\"\n").unwrap();
    let reply = service.handle_turn(None, "#reload_config", None).await;
    assert_eq!(reply, Reply::Info("Config reloaded".into()));
    assert_eq!(service.config().load().provider.model, "glm-4-plus");
}
