use async_trait::async_trait;
use super::types::{SubmitReceipt, TaskId, UploadForm, UploadTask, VideoInfo};
use super::errors::Result;

/// 远端上传引擎 - 任务状态的唯一权威来源
///
/// 所有方法都是一次性的往返请求：本层不做重试、超时或取消。
#[async_trait]
pub trait UploadEngine: Send + Sync {
    /// 创建上传任务，失败时返回错误
    async fn create_upload_task(&self, uid: u64, template_name: &str, video: &VideoInfo) -> Result<()>;

    /// 开始上传，返回引擎是否接受
    async fn start_upload(&self, task_id: &TaskId) -> Result<bool>;

    /// 暂停上传
    async fn pause_upload(&self, task_id: &TaskId) -> Result<bool>;

    /// 取消上传
    async fn cancel_upload(&self, task_id: &TaskId) -> Result<bool>;

    /// 重试上传
    async fn retry_upload(&self, task_id: &TaskId) -> Result<()>;

    /// 获取完整的上传队列快照
    async fn get_upload_queue(&self) -> Result<Vec<UploadTask>>;

    /// 提交投稿
    async fn submit(&self, uid: u64, form: &UploadForm) -> Result<SubmitReceipt>;
}

/// 毫秒级时钟
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}
