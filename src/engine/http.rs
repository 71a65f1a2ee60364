use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use crate::config::SyncConfig;
use crate::core::{
    Result, SubmitReceipt, SyncError, TaskId, UploadEngine, UploadForm, UploadTask, VideoInfo,
};

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    uid: u64,
    template: &'a str,
    video: &'a VideoInfo,
}

#[derive(Serialize)]
struct TaskRequest<'a> {
    task_id: &'a TaskId,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    uid: u64,
    form: &'a UploadForm,
}

#[derive(Serialize)]
struct EmptyRequest {}

/// 基于 HTTP 的上传引擎客户端
///
/// 每个命令都是 `POST {endpoint}/{command}`，请求体和响应体都是 JSON。
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpEngine {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(Client::new(), endpoint, None)
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| SyncError::Config(format!("Failed to build http client: {}", err)))?;

        Self::with_client(client, &config.endpoint, config.token.clone())
    }

    pub fn with_client(client: Client, endpoint: &str, token: Option<String>) -> Result<Self> {
        // 保证以 '/' 结尾，否则 join 会替换掉最后一段路径
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        let endpoint = Url::parse(&normalized)
            .map_err(|_e| SyncError::Config(format!("Invalid url: {:?}", endpoint)))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn command_url(&self, command: &str) -> Result<Url> {
        self.endpoint
            .join(command)
            .map_err(|err| SyncError::Config(format!("Invalid command {}: {}", command, err)))
    }

    fn create_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(token)
                .map_err(|err| SyncError::Config(format!("Invalid token: {}", err)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn call<B: Serialize + ?Sized>(&self, command: &str, body: &B) -> Result<Response> {
        let response = self
            .client
            .post(self.command_url(command)?)
            .headers(self.create_headers()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = if message.is_empty() {
                format!("{} failed with status {}", command, status)
            } else {
                message
            };
            return Err(SyncError::engine(status.as_u16(), message));
        }

        Ok(response)
    }

    async fn call_json<B, T>(&self, command: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.call(command, body).await?.text().await?;
        serde_json::from_str(&text)
            .map_err(|err| SyncError::malformed(format!("{} response: {}", command, err)))
    }
}

/// 解析 `get_upload_queue` 的响应体
pub fn parse_queue(body: &str) -> Result<Vec<UploadTask>> {
    serde_json::from_str(body).map_err(|err| SyncError::malformed(format!("upload queue: {}", err)))
}

#[async_trait]
impl UploadEngine for HttpEngine {
    async fn create_upload_task(&self, uid: u64, template_name: &str, video: &VideoInfo) -> Result<()> {
        let body = CreateTaskRequest {
            uid,
            template: template_name,
            video,
        };
        self.call("create_upload_task", &body).await?;
        Ok(())
    }

    async fn start_upload(&self, task_id: &TaskId) -> Result<bool> {
        self.call_json("start_upload", &TaskRequest { task_id }).await
    }

    async fn pause_upload(&self, task_id: &TaskId) -> Result<bool> {
        self.call_json("pause_upload", &TaskRequest { task_id }).await
    }

    async fn cancel_upload(&self, task_id: &TaskId) -> Result<bool> {
        self.call_json("cancel_upload", &TaskRequest { task_id }).await
    }

    async fn retry_upload(&self, task_id: &TaskId) -> Result<()> {
        self.call("retry_upload", &TaskRequest { task_id }).await?;
        Ok(())
    }

    async fn get_upload_queue(&self) -> Result<Vec<UploadTask>> {
        let text = self.call("get_upload_queue", &EmptyRequest {}).await?.text().await?;
        parse_queue(&text)
    }

    async fn submit(&self, uid: u64, form: &UploadForm) -> Result<SubmitReceipt> {
        self.call_json("submit", &SubmitRequest { uid, form }).await
    }
}
