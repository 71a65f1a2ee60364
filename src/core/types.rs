use serde::{Deserialize, Serialize};

/// 引擎分配的任务唯一标识，同一逻辑任务重试时保持不变
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 任务状态，权威值永远来自引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TaskStatus {
    /// 等待中
    #[serde(alias = "Waiting")]
    Pending,
    /// 上传中
    Running,
    /// 已暂停
    Paused,
    /// 已取消
    #[serde(alias = "Cancelled")]
    Canceled,
    /// 失败
    Failed,
    /// 已完成
    Completed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Canceled | TaskStatus::Completed)
    }

    /// 引擎侧可能出现的状态迁移。
    ///
    /// 除了命令驱动的迁移，还包括引擎自行触发的迁移（失败、完成、重新排队）。
    /// 终态没有任何出边。
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;

        match (from, to) {
            (Pending, Running) => true,
            (Running, Paused) | (Paused, Running) => true,
            (Pending | Running | Paused | Failed, Canceled) => true,
            (Running, Completed) => true,
            (Running | Failed, Pending | Running) => true,
            (Paused, Pending) | (Pending, Paused) => true,
            (Pending | Running, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Paused => "Paused",
            TaskStatus::Canceled => "Canceled",
            TaskStatus::Failed => "Failed",
            TaskStatus::Completed => "Completed",
        };
        f.pad(name)
    }
}

/// 用户摘要（由会话提供方给出）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserSummary {
    pub uid: u64,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

/// 视频描述
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub finished_at: u64,
    /// 调用方标记的"已完成"，不会发送给引擎
    #[serde(default, skip_serializing)]
    pub complete: bool,
}

impl VideoInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// 上传任务快照
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadTask {
    pub id: TaskId,
    #[serde(rename = "template", default)]
    pub template_name: String,
    pub user: UserSummary,
    pub video: VideoInfo,
    pub status: TaskStatus,
    /// 进度 0-100
    #[serde(default)]
    pub progress: f64,
    /// 已发送的累计字节数
    #[serde(default)]
    pub total_transmit_bytes: u64,
    #[serde(default)]
    pub total_size: u64,
    /// 本地推算的速度（字节/秒），每次刷新重算，不信任也不回写引擎
    #[serde(skip)]
    pub speed: f64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub finished_at: Option<u64>,
    #[serde(default)]
    pub retry_count: u32,
}

impl UploadTask {
    pub fn new(
        id: impl Into<TaskId>,
        template_name: impl Into<String>,
        user: UserSummary,
        video: VideoInfo,
    ) -> Self {
        Self {
            id: id.into(),
            template_name: template_name.into(),
            user,
            video,
            status: TaskStatus::Pending,
            progress: 0.0,
            total_transmit_bytes: 0,
            total_size: 0,
            speed: 0.0,
            error_message: None,
            created_at: None,
            started_at: None,
            finished_at: None,
            retry_count: 0,
        }
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.user.username, self.video.title)
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// 从开始上传到 `now_ms` 经过的毫秒数；未开始时为 `None`
    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        self.started_at.map(|started| now_ms.saturating_sub(started))
    }

    /// 边界校验：拒绝引擎返回的畸形任务
    pub fn validate(&self) -> super::errors::Result<()> {
        if self.id.as_str().is_empty() {
            return Err(super::errors::SyncError::malformed("task with empty id"));
        }
        if !self.progress.is_finite() || !(0.0..=100.0).contains(&self.progress) {
            return Err(super::errors::SyncError::malformed(format!(
                "task {} progress out of range: {}",
                self.id, self.progress
            )));
        }
        Ok(())
    }
}

/// 开始/暂停/取消命令的结果：引擎明确接受或拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Accepted,
    Declined,
}

impl Ack {
    pub fn is_accepted(self) -> bool {
        self == Ack::Accepted
    }

    /// 1 表示引擎接受，0 表示拒绝
    pub fn as_flag(self) -> u8 {
        match self {
            Ack::Accepted => 1,
            Ack::Declined => 0,
        }
    }
}

impl From<bool> for Ack {
    fn from(value: bool) -> Self {
        if value { Ack::Accepted } else { Ack::Declined }
    }
}

/// 投稿表单
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    /// 1-自制 2-转载
    #[serde(default)]
    pub copyright: u8,
    /// 转载来源
    #[serde(default)]
    pub source: String,
    /// 追加视频时的 avid
    #[serde(default)]
    pub aid: Option<u64>,
    /// 投稿分区
    #[serde(default)]
    pub tid: u32,
    /// 逗号分隔的标签
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub dynamic: String,
    #[serde(default)]
    pub videos: Vec<VideoInfo>,
    /// 定时发布（10 位时间戳）
    #[serde(default)]
    pub dtime: Option<u32>,
    #[serde(default)]
    pub open_subtitle: bool,
    #[serde(default)]
    pub interactive: u8,
    #[serde(default)]
    pub mission_id: Option<u32>,
    #[serde(default)]
    pub topic_id: Option<u32>,
    #[serde(default)]
    pub season_id: Option<u64>,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub dolby: u8,
    #[serde(default)]
    pub lossless_music: u8,
    #[serde(default)]
    pub no_reprint: u8,
    #[serde(default)]
    pub open_elec: u8,
    #[serde(default)]
    pub up_selection_reply: u8,
    #[serde(default)]
    pub up_close_reply: u8,
    #[serde(default)]
    pub up_close_danmu: u8,
    #[serde(default)]
    pub is_only_self: u8,
}

impl UploadForm {
    pub fn validate(&self) -> super::errors::Result<()> {
        use super::errors::SyncError;

        if self.title.trim().is_empty() {
            return Err(SyncError::invalid_input("form title is empty"));
        }
        if self.videos.is_empty() {
            return Err(SyncError::invalid_input("form has no videos"));
        }
        if !matches!(self.copyright, 1 | 2) {
            return Err(SyncError::invalid_input(format!(
                "copyright must be 1 or 2, got {}",
                self.copyright
            )));
        }
        Ok(())
    }
}

/// 投稿结果，对本层不透明
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubmitReceipt(pub serde_json::Value);

/// 停滞告警
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallWarning {
    pub task_id: TaskId,
    pub username: String,
    pub video_title: String,
    /// 自开始上传以来的毫秒数
    pub idle_ms: u64,
    pub threshold_ms: u64,
}

impl StallWarning {
    pub fn message(&self) -> String {
        format!(
            "{}-{} has not uploaded anything for over {} seconds, retrying...",
            self.username,
            self.video_title,
            self.threshold_ms / 1000
        )
    }
}

/// 会话事件
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// 新快照已替换镜像
    SnapshotApplied {
        seq: u64,
        task_count: usize,
    },

    /// 过期快照被丢弃
    SnapshotDiscarded {
        seq: u64,
        applied_seq: u64,
    },

    /// 检测到停滞任务，正在重试
    Stalled(StallWarning),

    /// 停滞恢复重试失败
    RecoveryFailed {
        task_id: TaskId,
        error: String,
    },

    /// 会话已关闭
    Closed,
}
