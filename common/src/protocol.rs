//! 通信プロトコル定義
//!
//! Keeper↔Ollama間で使うメッセージ（`/api/ps`, `/api/generate`）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// ロード済みモデルを無期限に保持させる`keep_alive`値
pub const KEEP_ALIVE_FOREVER: i64 = -1;

/// `GET /api/ps` レスポンス
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PsResponse {
    /// 現在メモリ上にあるモデル一覧
    pub models: Vec<RunningModel>,
}

/// ロード済みモデル情報
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunningModel {
    /// モデル名 (例: "gemma3:latest")
    pub name: String,
    /// モデル識別子
    #[serde(default)]
    pub model: Option<String>,
    /// モデルサイズ（バイト）
    #[serde(default)]
    pub size: Option<u64>,
    /// VRAM使用量（バイト）
    #[serde(default)]
    pub size_vram: Option<u64>,
    /// アンロード予定時刻
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl RunningModel {
    /// 指定モデル名と一致するか
    ///
    /// タグ省略時は`:latest`として比較する。
    pub fn matches(&self, target: &str) -> bool {
        normalize_tag(&self.name) == normalize_tag(target)
            || self
                .model
                .as_deref()
                .is_some_and(|m| normalize_tag(m) == normalize_tag(target))
    }
}

impl PsResponse {
    /// ロード済みモデル名の一覧
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}

/// 他モデルのうち最も遅いアンロード予定時刻
///
/// 期限切れ済みの時刻は無視する。
pub fn latest_expiry(models: &[RunningModel], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    models
        .iter()
        .filter_map(|m| m.expires_at)
        .filter(|at| *at > now)
        .max()
}

fn normalize_tag(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:latest", name)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc))))
}

/// `POST /api/generate` リクエスト（プロンプトなし＝ロードのみ）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    /// ロードするモデル名
    pub model: String,
    /// ストリーミング無効
    pub stream: bool,
    /// アイドル時のアンロードまでの時間（-1で無期限）
    pub keep_alive: i64,
    /// ランナーオプション
    pub options: GenerateOptions,
}

/// ランナーオプション
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateOptions {
    /// コンテキスト長
    pub num_ctx: u32,
}

impl GenerateRequest {
    /// ロード要求を作成
    pub fn load(model: &str, context_length: u32) -> Self {
        Self {
            model: model.to_string(),
            stream: false,
            keep_alive: KEEP_ALIVE_FOREVER,
            options: GenerateOptions {
                num_ctx: context_length,
            },
        }
    }
}

/// `POST /api/generate` レスポンス（必要なフィールドのみ）
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GenerateResponse {
    /// モデル名
    #[serde(default)]
    pub model: Option<String>,
    /// 完了フラグ
    #[serde(default)]
    pub done: Option<bool>,
    /// 完了理由 (ロードのみの場合は "load")
    #[serde(default)]
    pub done_reason: Option<String>,
}
