//! 設定管理
//!
//! 環境変数から`KeeperConfig`を起動時に一度だけ組み立てる。
//! 数値の解釈に失敗した場合はデフォルトへフォールバックせず、起動エラーとする。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 維持対象モデルの環境変数名
pub const ENV_TARGET_MODEL: &str = "TARGET_MODEL";
/// サーバーアドレスの環境変数名
pub const ENV_OLLAMA_URI: &str = "OLLAMA_URI";
/// サイクル間隔の環境変数名
pub const ENV_CYCLE_INTERVAL: &str = "CYCLE_INTERVAL";
/// モニター間隔の環境変数名
pub const ENV_MONITOR_INTERVAL: &str = "MONITOR_INTERVAL";
/// コンテキスト長の環境変数名
pub const ENV_CONTEXT_LENGTH: &str = "CONTEXT_LENGTH";
/// ログレベルの環境変数名
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// ポーリングタイムアウトの環境変数名
pub const ENV_POLL_TIMEOUT: &str = "POLL_TIMEOUT";

/// Get a variable, treating empty values as unset
fn get<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Parse a variable strictly, returning the default only when it is unset
fn get_parse<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(lookup, name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Parse a positive number of seconds
fn get_secs<F>(lookup: &F, name: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = get_parse(lookup, name, default)?;
    if secs == 0 {
        return Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// TRACE
    Trace,
    /// DEBUG
    Debug,
    /// INFO
    #[default]
    Info,
    /// WARN / WARNING
    Warn,
    /// ERROR
    Error,
}

impl LogLevel {
    /// tracingのフィルタ指定に使う小文字表記
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// HTTPクライアント内部のログまで出すレベルか
    pub fn is_verbose(&self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug)
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// キーパー設定
///
/// 起動時に一度だけ構築され、以降は変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperConfig {
    /// 維持対象モデル (デフォルト: "gemma3")
    pub target_model: String,
    /// OllamaサーバーのベースURL (デフォルト: "http://localhost:11434")
    pub ollama_uri: String,
    /// リロード判定サイクルの間隔 (デフォルト: 5秒)
    pub cycle_interval: Duration,
    /// ハートビートログの間隔 (デフォルト: 60秒)
    pub monitor_interval: Duration,
    /// ロード時に渡すコンテキスト長 (デフォルト: 4096)
    pub context_length: u32,
    /// ログレベル (デフォルト: INFO)
    pub log_level: LogLevel,
    /// `/api/ps`のタイムアウト (デフォルト: 30秒)
    ///
    /// ロード要求には適用しない。
    pub poll_timeout: Duration,
}

fn default_target_model() -> String {
    "gemma3".to_string()
}

fn default_ollama_uri() -> String {
    "http://localhost:11434".to_string()
}

const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 5;
const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 60;
const DEFAULT_CONTEXT_LENGTH: u32 = 4096;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            target_model: default_target_model(),
            ollama_uri: default_ollama_uri(),
            cycle_interval: Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECS),
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            context_length: DEFAULT_CONTEXT_LENGTH,
            log_level: LogLevel::default(),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

impl KeeperConfig {
    /// プロセス環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ソースから設定を読み込む
    ///
    /// `lookup`は変数名を受け取り、値があれば返す。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_model = get(&lookup, ENV_TARGET_MODEL)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(default_target_model);

        let ollama_uri = normalize_uri(
            &get(&lookup, ENV_OLLAMA_URI).unwrap_or_else(default_ollama_uri),
        )?;

        let cycle_interval = get_secs(&lookup, ENV_CYCLE_INTERVAL, DEFAULT_CYCLE_INTERVAL_SECS)?;
        let monitor_interval =
            get_secs(&lookup, ENV_MONITOR_INTERVAL, DEFAULT_MONITOR_INTERVAL_SECS)?;
        let poll_timeout = get_secs(&lookup, ENV_POLL_TIMEOUT, DEFAULT_POLL_TIMEOUT_SECS)?;

        let context_length: u32 = get_parse(&lookup, ENV_CONTEXT_LENGTH, DEFAULT_CONTEXT_LENGTH)?;
        if context_length == 0 {
            return Err(ConfigError::OutOfRange {
                name: ENV_CONTEXT_LENGTH.to_string(),
                value: context_length.to_string(),
            });
        }

        let log_level = match get(&lookup, ENV_LOG_LEVEL) {
            Some(raw) => raw.parse()?,
            None => LogLevel::default(),
        };

        Ok(Self {
            target_model,
            ollama_uri,
            cycle_interval,
            monitor_interval,
            context_length,
            log_level,
            poll_timeout,
        })
    }
}

/// サーバーアドレスを検証し、末尾の`/`を取り除く
fn normalize_uri(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidUri(raw.to_string()));
    }
    Ok(trimmed.to_string())
}
