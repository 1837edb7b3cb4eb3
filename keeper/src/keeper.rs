//! キーパーループ
//!
//! ロード済みモデルを定期的に確認し、何もロードされていなければ
//! 対象モデルをロードさせる。
//!
//! - サイクルタイマー: ポーリングとロード判定
//! - モニタータイマー: ハートビートログ（判定には関与しない）
//!
//! 通信エラーはすべて一過性として記録し、次のサイクルへ進む。

use std::future::Future;

use chrono::Utc;
use ollama_keeper_common::config::KeeperConfig;
use ollama_keeper_common::error::KeeperError;
use ollama_keeper_common::protocol::latest_expiry;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::client::ModelServer;
use crate::status::KeeperStatus;

/// 1サイクルの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// ロード済みモデルが無く、ロード要求が成功した
    LoadIssued,
    /// ロード済みモデルが無く、ロード要求が失敗した
    LoadFailed,
    /// 何らかのモデルがロード済みのため何もしなかった
    AlreadyLoaded {
        /// ロード済みモデル名
        models: Vec<String>,
        /// 対象モデルが含まれていたか
        target_loaded: bool,
    },
    /// ロード済みモデルの取得に失敗した
    PollFailed,
}

/// 対象モデルをロード状態に保つキーパー
pub struct ModelKeeper<S> {
    server: S,
    config: KeeperConfig,
    status: KeeperStatus,
}

impl<S: ModelServer> ModelKeeper<S> {
    /// 新しいキーパーを作成
    pub fn new(server: S, config: KeeperConfig) -> Self {
        Self {
            server,
            config,
            status: KeeperStatus::default(),
        }
    }

    /// 現在の実行状況
    pub fn status(&self) -> &KeeperStatus {
        &self.status
    }

    /// 1サイクル分のポーリングとロード判定を行う
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let target = self.config.target_model.as_str();
        debug!(target_model = %target, "Entering main cycle");

        let outcome = match self.server.list_loaded_models().await {
            Err(e) => {
                log_fault("list_loaded_models", &e);
                CycleOutcome::PollFailed
            }
            Ok(models) if models.is_empty() => {
                info!(
                    target_model = %target,
                    context_length = self.config.context_length,
                    "No models are loaded. Loading target model"
                );
                match self
                    .server
                    .load_model(target, self.config.context_length)
                    .await
                {
                    Ok(_) => {
                        info!(target_model = %target, "Successfully loaded model with keep_alive=-1");
                        CycleOutcome::LoadIssued
                    }
                    Err(e) => {
                        log_fault("load_model", &e);
                        CycleOutcome::LoadFailed
                    }
                }
            }
            Ok(models) => {
                let target_loaded = models.iter().any(|m| m.matches(target));
                let names: Vec<String> = models.iter().map(|m| m.name.clone()).collect();

                if target_loaded {
                    info!(target_model = %target, loaded_models = ?names, "Target model is already loaded");
                } else {
                    match latest_expiry(&models, Utc::now()) {
                        Some(expires_at) => info!(
                            target_model = %target,
                            loaded_models = ?names,
                            expires_at = %expires_at.to_rfc3339(),
                            "Other models loaded. Target will be loaded after they unload"
                        ),
                        None => info!(
                            target_model = %target,
                            loaded_models = ?names,
                            "Other models loaded with no expiration. Skipping load"
                        ),
                    }
                }

                CycleOutcome::AlreadyLoaded {
                    models: names,
                    target_loaded,
                }
            }
        };

        self.status.record(&outcome, target, Utc::now());
        outcome
    }

    /// ハートビートログを出力する
    pub fn emit_heartbeat(&self) {
        let status = &self.status;
        info!(
            target_model = %self.config.target_model,
            target_loaded = status.target_loaded,
            loaded_models = ?status.loaded_models,
            cycles = status.cycles,
            loads_issued = status.loads_issued,
            load_failures = status.load_failures,
            poll_failures = status.poll_failures,
            last_poll_at = ?status.last_poll_at.map(|t| t.to_rfc3339()),
            "Keeper heartbeat"
        );
    }

    /// シャットダウンまでキーパーループを実行する
    ///
    /// `shutdown`が完了するとループを抜け、最終的な状況を返す。
    /// 実行中のサイクル（ロード待ちを含む）もその時点で中断する。
    ///
    /// 次のサイクルは前のサイクルの完了から`cycle_interval`後に始まる。
    pub async fn run<F>(mut self, shutdown: F) -> KeeperStatus
    where
        F: Future<Output = ()>,
    {
        let cycle_interval = self.config.cycle_interval;
        let monitor_interval = self.config.monitor_interval;

        // The first cycle tick fires immediately; the first heartbeat waits a full interval.
        let mut cycle_timer = interval(cycle_interval);
        let mut monitor_timer = interval_at(Instant::now() + monitor_interval, monitor_interval);
        monitor_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        info!(
            target_model = %self.config.target_model,
            cycle_interval_secs = cycle_interval.as_secs(),
            monitor_interval_secs = monitor_interval.as_secs(),
            "Keeper loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping keeper loop");
                    break;
                }
                _ = cycle_timer.tick() => {
                    tokio::select! {
                        biased;

                        _ = &mut shutdown => {
                            info!("Shutdown requested during cycle, stopping keeper loop");
                            break;
                        }
                        _ = self.run_cycle() => {}
                    }
                    // Sleep a full interval after the cycle, however long it took.
                    cycle_timer.reset();
                    debug!(
                        cycle_interval_secs = cycle_interval.as_secs(),
                        "Cycle complete"
                    );
                }
                _ = monitor_timer.tick() => {
                    self.emit_heartbeat();
                }
            }
        }

        info!(
            cycles = self.status.cycles,
            loads_issued = self.status.loads_issued,
            load_failures = self.status.load_failures,
            poll_failures = self.status.poll_failures,
            "Keeper loop stopped"
        );
        self.status
    }
}

/// サーバーとの通信エラーはすべて一過性として扱う
fn log_fault(operation: &'static str, err: &KeeperError) {
    error!(
        operation,
        fault = "transient",
        kind = err.kind(),
        error = %err,
        "Request to model server failed; continuing with next cycle"
    );
}
