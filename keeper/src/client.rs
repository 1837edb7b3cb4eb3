//! Ollamaクライアント
//!
//! `/api/ps`でロード済みモデルを取得し、`/api/generate`でモデルをロードさせる。

use std::time::Duration;

use async_trait::async_trait;
use ollama_keeper_common::error::{KeeperError, KeeperResult};
use ollama_keeper_common::protocol::{
    GenerateRequest, GenerateResponse, PsResponse, RunningModel,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// エラー時にログへ残すレスポンスボディの最大文字数
const MAX_ERROR_BODY_CHARS: usize = 200;

/// 接続確立のタイムアウト（ポーリング・ロード共通）
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// モデルサーバーへの操作
///
/// キーパーループはこのトレイト越しにサーバーを扱う。
#[async_trait]
pub trait ModelServer: Send + Sync {
    /// 現在ロードされているモデル一覧を取得
    async fn list_loaded_models(&self) -> KeeperResult<Vec<RunningModel>>;

    /// 指定モデルをロードさせる
    async fn load_model(&self, model: &str, context_length: u32)
        -> KeeperResult<GenerateResponse>;
}

/// Ollama HTTP APIクライアント
///
/// `poll_timeout`は`/api/ps`にのみ適用する。ロード要求は大きなモデルの
/// コールドロードで数分かかることがあるため、全体タイムアウトを設けない。
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl OllamaClient {
    /// 新しいクライアントを作成
    pub fn new(base_url: &str, poll_timeout: Duration) -> KeeperResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| KeeperError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_timeout,
        })
    }

    /// ベースURL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ModelServer for OllamaClient {
    async fn list_loaded_models(&self) -> KeeperResult<Vec<RunningModel>> {
        let url = format!("{}/api/ps", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(request_error)?;

        let ps: PsResponse = decode(response).await?;
        debug!(model_count = ps.models.len(), models = ?ps.model_names(), "API ps response");
        Ok(ps.models)
    }

    async fn load_model(
        &self,
        model: &str,
        context_length: u32,
    ) -> KeeperResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest::load(model, context_length);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let generated: GenerateResponse = decode(response).await?;
        debug!(
            model = %model,
            done = ?generated.done,
            done_reason = ?generated.done_reason,
            "Generate response for load"
        );
        Ok(generated)
    }
}

fn request_error(e: reqwest::Error) -> KeeperError {
    if e.is_decode() {
        KeeperError::MalformedResponse(e.to_string())
    } else {
        KeeperError::Connection(e.to_string())
    }
}

/// ステータスを検査し、ボディをJSONとしてデコードする
async fn decode<T: DeserializeOwned>(response: Response) -> KeeperResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(request_error)?;

    if !status.is_success() {
        return Err(KeeperError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    Ok(serde_json::from_str(&body)?)
}
