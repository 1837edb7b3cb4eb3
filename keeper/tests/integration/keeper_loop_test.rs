//! Integration Test: キーパーループ
//!
//! 環境変数による設定 → 指定間隔でのポーリング → シャットダウン

use std::time::Duration;

use ollama_keeper::ModelKeeper;
use ollama_keeper_common::config::KeeperConfig;
use serial_test::serial;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::ollama::{client_for, expect_load, spawn_mock_ollama};

const KEEPER_VARS: [&str; 8] = [
    "TARGET_MODEL",
    "OLLAMA_URI",
    "OLLAMA_HOST",
    "CYCLE_INTERVAL",
    "MONITOR_INTERVAL",
    "CONTEXT_LENGTH",
    "LOG_LEVEL",
    "POLL_TIMEOUT",
];

fn clear_env() {
    for name in KEEPER_VARS {
        std::env::remove_var(name);
    }
}

#[tokio::test]
#[serial]
async fn env_configured_target_and_cadence_are_used() {
    let mock = spawn_mock_ollama(&[]).await;
    // Cycles at t=0s and t=2s before the loop is stopped at 3s.
    expect_load(&mock, "llama3", 4096, 2).await;

    clear_env();
    std::env::set_var("TARGET_MODEL", "llama3");
    std::env::set_var("CYCLE_INTERVAL", "2");
    std::env::set_var("OLLAMA_URI", mock.uri());
    let config = KeeperConfig::from_env().expect("valid config");
    clear_env();

    assert_eq!(config.cycle_interval, Duration::from_secs(2));

    let keeper = ModelKeeper::new(client_for(&config), config);
    let status = keeper
        .run(tokio::time::sleep(Duration::from_millis(3000)))
        .await;

    assert_eq!(status.cycles, 2);
    assert_eq!(status.loads_issued, 2);
}

#[test]
#[serial]
fn invalid_interval_fails_startup() {
    clear_env();
    std::env::set_var("CYCLE_INTERVAL", "five");

    let result = KeeperConfig::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn scheme_less_ollama_host_does_not_block_startup() {
    clear_env();
    std::env::set_var("OLLAMA_HOST", "0.0.0.0:11434");
    let result = KeeperConfig::from_env();
    clear_env();

    let config = result.expect("OLLAMA_HOST must not be read as the server address");
    assert_eq!(config.ollama_uri, "http://localhost:11434");
    assert_eq!(client_for(&config).base_url(), "http://localhost:11434");
}

#[tokio::test]
async fn loop_stops_on_shutdown_request() {
    let mock = spawn_mock_ollama(&["gemma3"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let config = KeeperConfig {
        ollama_uri: mock.uri(),
        cycle_interval: Duration::from_secs(1),
        ..KeeperConfig::default()
    };
    let keeper = ModelKeeper::new(client_for(&config), config);

    let (trigger, shutdown) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let _ = trigger.send(());
    });

    let stop = async {
        let _ = shutdown.await;
    };
    let status = tokio::time::timeout(Duration::from_secs(5), keeper.run(stop))
        .await
        .expect("keeper loop should stop after shutdown request");

    assert_eq!(status.cycles, 2);
    assert!(status.target_loaded);
}
