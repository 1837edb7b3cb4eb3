//! Ollama Model Keeper Common
//!
//! キーパー本体とテストで共有する設定・エラー・通信プロトコル定義

#![warn(missing_docs)]

/// 設定管理（環境変数ヘルパー、KeeperConfig）
pub mod config;

/// エラー型定義
pub mod error;

/// Ollama API通信プロトコル定義
pub mod protocol;
