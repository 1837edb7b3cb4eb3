//! Ollama Model Keeper
//!
//! ローカルのOllamaサーバーで対象モデルを常にロード状態に保つデーモン

#![warn(missing_docs)]

/// Ollamaクライアント（ロード済みモデル取得・モデルロード）
pub mod client;

/// キーパーループ（ポーリング・ロード判定・ハートビート）
pub mod keeper;

/// ロギング初期化ユーティリティ
pub mod logging;

/// シャットダウン制御
pub mod shutdown;

/// キーパーの実行状況
pub mod status;

pub use client::{ModelServer, OllamaClient};
pub use keeper::{CycleOutcome, ModelKeeper};
pub use status::KeeperStatus;
