//! ロギング初期化ユーティリティ
//!
//! `LOG_LEVEL`からフィルタを組み立てる。`RUST_LOG`が設定されている場合はそちらを優先する。

use ollama_keeper_common::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// HTTPクライアント内部のクレート（INFO時は警告以上のみ出力）
const HTTP_STACK_TARGETS: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

/// ログレベルからフィルタ指定文字列を作成
pub fn filter_directives(level: LogLevel) -> String {
    let mut directives = level.as_str().to_string();
    if level == LogLevel::Info {
        for target in HTTP_STACK_TARGETS {
            directives.push_str(&format!(",{}=warn", target));
        }
    }
    directives
}

/// ログレベルからフィルタを作成
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// グローバルサブスクライバーを初期化
pub fn init(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .try_init()
}
