//! キーパー状態
//!
//! ハートビートログ用のカウンタと直近の観測結果。永続化はしない。

use chrono::{DateTime, Utc};

use crate::keeper::CycleOutcome;

/// キーパーループの実行状況
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeeperStatus {
    /// 実行したサイクル数
    pub cycles: u64,
    /// 成功したロード要求数
    pub loads_issued: u64,
    /// 失敗したロード要求数
    pub load_failures: u64,
    /// 失敗したポーリング数
    pub poll_failures: u64,
    /// 直近に観測したロード済みモデル
    pub loaded_models: Vec<String>,
    /// 直近の観測で対象モデルがロード済みだったか
    pub target_loaded: bool,
    /// 直近のポーリング成功時刻
    pub last_poll_at: Option<DateTime<Utc>>,
}

impl KeeperStatus {
    /// サイクル結果を反映する
    ///
    /// ポーリング失敗時は直前の観測結果を保持する。
    pub fn record(&mut self, outcome: &CycleOutcome, target_model: &str, now: DateTime<Utc>) {
        self.cycles += 1;

        match outcome {
            CycleOutcome::PollFailed => {
                self.poll_failures += 1;
                return;
            }
            CycleOutcome::LoadIssued => {
                self.loads_issued += 1;
                self.loaded_models = vec![target_model.to_string()];
                self.target_loaded = true;
            }
            CycleOutcome::LoadFailed => {
                self.load_failures += 1;
                self.loaded_models.clear();
                self.target_loaded = false;
            }
            CycleOutcome::AlreadyLoaded {
                models,
                target_loaded,
            } => {
                self.loaded_models = models.clone();
                self.target_loaded = *target_loaded;
            }
        }

        self.last_poll_at = Some(now);
    }
}
