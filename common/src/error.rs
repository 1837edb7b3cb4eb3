//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 実行時の障害はすべて一過性として扱い、ループを止めない。
//! 設定エラーだけが起動を中断させる。

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 数値として解釈できない値
    #[error("Invalid value for {name}: '{value}' is not a valid number")]
    InvalidNumber {
        /// 環境変数名
        name: String,
        /// 設定された値
        value: String,
    },

    /// 許容範囲外の値（0など）
    #[error("Invalid value for {name}: '{value}' is out of range")]
    OutOfRange {
        /// 環境変数名
        name: String,
        /// 設定された値
        value: String,
    },

    /// 未知のログレベル
    #[error("Invalid log level: '{0}' (expected TRACE, DEBUG, INFO, WARN or ERROR)")]
    InvalidLogLevel(String),

    /// http(s)以外のサーバーアドレス
    #[error("Invalid server address: '{0}' (expected http:// or https://)")]
    InvalidUri(String),
}

/// キーパーのエラー型
#[derive(Debug, Error)]
pub enum KeeperError {
    /// 接続失敗・タイムアウト等の通信エラー
    #[error("Connection error: {0}")]
    Connection(String),

    /// 非2xxレスポンス
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTPステータスコード
        status: u16,
        /// レスポンスボディ（先頭のみ）
        body: String,
    },

    /// 期待した形式でないレスポンス
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 設定エラー
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KeeperError {
    /// 次のサイクルで回復しうるエラーか
    pub fn is_transient(&self) -> bool {
        !matches!(self, KeeperError::Config(_))
    }

    /// 構造化ログ用の分類ラベル
    pub fn kind(&self) -> &'static str {
        match self {
            KeeperError::Connection(_) => "connection",
            KeeperError::Status { .. } => "status",
            KeeperError::MalformedResponse(_) => "malformed_response",
            KeeperError::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(err: serde_json::Error) -> Self {
        KeeperError::MalformedResponse(err.to_string())
    }
}

/// キーパーのResult型
pub type KeeperResult<T> = Result<T, KeeperError>;
