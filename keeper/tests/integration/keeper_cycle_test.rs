//! Integration Test: 1サイクル分の判定
//!
//! `/api/ps` → 判定 → `/api/generate` の流れを実HTTPで確認する

use std::time::Duration;

use ollama_keeper::{CycleOutcome, ModelKeeper};
use ollama_keeper_common::config::KeeperConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::ollama::{
    client_for, config_for, expect_load, expect_no_load, expect_slow_load, spawn_mock_ollama,
};

#[tokio::test]
async fn empty_list_triggers_single_load_with_defaults() {
    let mock = spawn_mock_ollama(&[]).await;
    expect_load(&mock, "gemma3", 4096, 1).await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadIssued);
}

#[tokio::test]
async fn loaded_target_triggers_no_load() {
    let mock = spawn_mock_ollama(&["gemma3"]).await;
    expect_no_load(&mock).await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(
        keeper.run_cycle().await,
        CycleOutcome::AlreadyLoaded {
            models: vec!["gemma3".to_string()],
            target_loaded: true,
        }
    );
}

#[tokio::test]
async fn other_loaded_model_triggers_no_load() {
    let mock = spawn_mock_ollama(&["llama3:8b", "qwen2.5:7b"]).await;
    expect_no_load(&mock).await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    match keeper.run_cycle().await {
        CycleOutcome::AlreadyLoaded {
            models,
            target_loaded,
        } => {
            assert_eq!(models, vec!["llama3:8b", "qwen2.5:7b"]);
            assert!(!target_loaded);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn custom_target_and_context_length_are_sent() {
    let mock = spawn_mock_ollama(&[]).await;
    expect_load(&mock, "llama3", 8192, 1).await;

    let config = KeeperConfig {
        target_model: "llama3".to_string(),
        context_length: 8192,
        ..config_for(&mock)
    };
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadIssued);
}

#[tokio::test]
async fn cold_load_slower_than_poll_timeout_succeeds() {
    let mock = spawn_mock_ollama(&[]).await;
    expect_slow_load(&mock, "gemma3", Duration::from_secs(2), 2).await;

    let config = KeeperConfig {
        poll_timeout: Duration::from_secs(1),
        ..config_for(&mock)
    };
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadIssued);
    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadIssued);
    assert_eq!(keeper.status().load_failures, 0);
}

#[tokio::test]
async fn server_error_on_poll_is_recovered() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ps"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .up_to_n_times(1)
        .mount(&mock)
        .await;
    crate::support::ollama::mount_ps(&mock, &[]).await;
    expect_load(&mock, "gemma3", 4096, 1).await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::PollFailed);
    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadIssued);
    assert_eq!(keeper.status().poll_failures, 1);
}

#[tokio::test]
async fn malformed_poll_response_is_recovered() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ps"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock)
        .await;
    expect_no_load(&mock).await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::PollFailed);
    assert_eq!(keeper.run_cycle().await, CycleOutcome::PollFailed);
    assert_eq!(keeper.status().cycles, 2);
}

#[tokio::test]
async fn failed_load_is_recovered() {
    let mock = spawn_mock_ollama(&[]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"model not found"}"#))
        .expect(2)
        .mount(&mock)
        .await;

    let config = config_for(&mock);
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadFailed);
    assert_eq!(keeper.run_cycle().await, CycleOutcome::LoadFailed);
    assert_eq!(keeper.status().load_failures, 2);
}

#[tokio::test]
async fn unreachable_server_is_recovered() {
    let mock = MockServer::start().await;
    let uri = mock.uri();
    drop(mock);

    let config = KeeperConfig {
        ollama_uri: uri,
        ..KeeperConfig::default()
    };
    let mut keeper = ModelKeeper::new(client_for(&config), config);

    assert_eq!(keeper.run_cycle().await, CycleOutcome::PollFailed);
    assert_eq!(keeper.run_cycle().await, CycleOutcome::PollFailed);
    assert_eq!(keeper.status().poll_failures, 2);
}
