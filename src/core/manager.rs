use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use crate::config::SyncConfig;
use super::errors::{Result, SyncError};
use super::progress::SpeedEstimator;
use super::stall::{StallDetector, DEFAULT_STALL_THRESHOLD_MS};
use super::store::{validate_snapshot, ApplyOutcome, RefreshOrdering, Snapshot, TaskStore};
use super::traits::{Clock, SystemClock, UploadEngine};
use super::types::{
    Ack, StallWarning, SubmitReceipt, SyncEvent, TaskId, TaskStatus, UploadForm, UploadTask,
    VideoInfo,
};

#[derive(Debug, Clone, Copy)]
enum TaskCommand {
    Start,
    Pause,
    Cancel,
}

impl TaskCommand {
    fn name(self) -> &'static str {
        match self {
            TaskCommand::Start => "start_upload",
            TaskCommand::Pause => "pause_upload",
            TaskCommand::Cancel => "cancel_upload",
        }
    }
}

/// 上传会话：持有队列镜像，并负责向引擎派发命令
///
/// 每个修改类操作在引擎成功响应后都会整体刷新一次镜像；
/// 引擎调用失败时直接返回错误，不会刷新。
pub struct UploadSession {
    engine: Arc<dyn UploadEngine>,
    clock: Arc<dyn Clock>,
    store: TaskStore,
    estimator: SpeedEstimator,
    detector: StallDetector,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl UploadSession {
    pub fn builder() -> UploadSessionBuilder {
        UploadSessionBuilder::new()
    }

    /// 订阅事件
    ///
    /// 接收速度跟不上时会丢失事件（lagged error）。
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// 纯本地查询，不会访问引擎
    pub fn get_task(&self, task_id: &TaskId) -> Option<UploadTask> {
        self.store.get(task_id)
    }

    /// 当前镜像
    pub fn tasks(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// 拉取完整快照并整体替换镜像，然后估算速度、检测停滞
    ///
    /// 停滞任务的恢复重试按快照顺序逐个等待完成后才返回；
    /// 引擎的 `retry_upload` 挂起时，本次刷新也会一起挂起（本层没有超时）。
    /// 需要上限时请在 `HttpEngine` 上配置 `request_timeout_secs`。
    pub async fn refresh(&self) -> Result<Snapshot> {
        let seq = self.store.begin_fetch();

        let mut tasks = self
            .engine
            .get_upload_queue()
            .await
            .inspect_err(|err| error!(seq, error = %err, "failed to fetch upload queue"))?;
        validate_snapshot(&tasks)
            .inspect_err(|err| error!(seq, error = %err, "rejected upload queue snapshot"))?;

        let now = self.clock.now_ms();
        self.estimator.annotate(&mut tasks, now);

        match self.store.apply(seq, tasks) {
            ApplyOutcome::Discarded { applied_seq, current } => {
                debug!(seq, applied_seq, "discarded stale snapshot");
                let _ = self.event_tx.send(SyncEvent::SnapshotDiscarded { seq, applied_seq });
                Ok(current)
            }
            ApplyOutcome::Applied { previous, current } => {
                log_transitions(&previous, &current);
                debug!(seq, tasks = current.len(), "applied snapshot");
                let _ = self.event_tx.send(SyncEvent::SnapshotApplied {
                    seq,
                    task_count: current.len(),
                });

                self.recover_stalled(&current, now).await;
                Ok(current)
            }
        }
    }

    /// 为尚未入队、也未被标记完成的视频创建任务，返回实际发出的创建命令数
    ///
    /// 任一创建失败都会中止并返回错误，此前已成功的创建不会回滚。
    pub async fn create_tasks(
        &self,
        uid: u64,
        template_name: &str,
        videos: &[VideoInfo],
    ) -> Result<usize> {
        if let Some(video) = videos.iter().find(|video| video.id.is_empty()) {
            return Err(SyncError::invalid_input(format!(
                "video '{}' has no id",
                video.title
            )));
        }

        let mut issued: HashSet<&str> = HashSet::new();
        let mut count = 0;

        for video in videos {
            if video.complete {
                debug!(video_id = %video.id, "skipping completed video");
                continue;
            }
            if self.store.contains(&video.id) || issued.contains(video.id.as_str()) {
                debug!(video_id = %video.id, "video already queued");
                continue;
            }

            self.engine
                .create_upload_task(uid, template_name, video)
                .await
                .inspect_err(|err| {
                    error!(uid, video_id = %video.id, error = %err, "failed to create upload task")
                })?;
            issued.insert(video.id.as_str());
            count += 1;
        }

        info!(uid, template = template_name, count, "created upload tasks");
        self.refresh().await?;

        Ok(count)
    }

    pub async fn start(&self, task_id: &TaskId) -> Result<Ack> {
        self.dispatch(TaskCommand::Start, task_id).await
    }

    pub async fn pause(&self, task_id: &TaskId) -> Result<Ack> {
        self.dispatch(TaskCommand::Pause, task_id).await
    }

    pub async fn cancel(&self, task_id: &TaskId) -> Result<Ack> {
        self.dispatch(TaskCommand::Cancel, task_id).await
    }

    /// 重试任务；`refresh` 为 `false` 时只发命令，不拉取快照
    pub async fn retry(&self, task_id: &TaskId, refresh: bool) -> Result<()> {
        self.send_retry(task_id).await?;
        if refresh {
            self.refresh().await?;
        }
        Ok(())
    }

    /// 提交投稿，不刷新镜像
    pub async fn submit(&self, uid: u64, form: &UploadForm) -> Result<SubmitReceipt> {
        form.validate()?;

        let receipt = self
            .engine
            .submit(uid, form)
            .await
            .inspect_err(|err| error!(uid, error = %err, "failed to submit form"))?;
        info!(uid, title = %form.title, "submitted form");

        Ok(receipt)
    }

    /// 关闭会话并清空镜像
    pub fn close(self) {
        self.store.clear();
        let _ = self.event_tx.send(SyncEvent::Closed);
        info!("upload session closed");
    }

    async fn dispatch(&self, command: TaskCommand, task_id: &TaskId) -> Result<Ack> {
        let accepted = match command {
            TaskCommand::Start => self.engine.start_upload(task_id).await,
            TaskCommand::Pause => self.engine.pause_upload(task_id).await,
            TaskCommand::Cancel => self.engine.cancel_upload(task_id).await,
        }
        .inspect_err(|err| error!(command = command.name(), %task_id, error = %err, "command failed"))?;

        let ack = Ack::from(accepted);
        if ack.is_accepted() {
            info!(command = command.name(), %task_id, "command accepted");
        } else {
            info!(command = command.name(), %task_id, "command declined by engine");
        }

        self.refresh().await?;
        Ok(ack)
    }

    async fn send_retry(&self, task_id: &TaskId) -> Result<()> {
        self.engine
            .retry_upload(task_id)
            .await
            .inspect_err(|err| error!(%task_id, error = %err, "failed to retry upload"))?;
        info!(%task_id, "retry requested");
        Ok(())
    }

    async fn recover_stalled(&self, tasks: &[UploadTask], now: u64) {
        self.detector.retain_present(tasks);

        for warning in self.detector.scan(tasks, now) {
            self.notify_stall(&warning);

            if !self.detector.should_retry(&warning.task_id, now) {
                debug!(task_id = %warning.task_id, "stall retry suppressed by cooldown");
                continue;
            }

            match self.send_retry(&warning.task_id).await {
                Ok(()) => self.detector.record_retry(&warning.task_id, now),
                Err(err) => {
                    let _ = self.event_tx.send(SyncEvent::RecoveryFailed {
                        task_id: warning.task_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    fn notify_stall(&self, warning: &StallWarning) {
        warn!(task_id = %warning.task_id, idle_ms = warning.idle_ms, "{}", warning.message());
        let _ = self.event_tx.send(SyncEvent::Stalled(warning.clone()));
    }
}

fn log_transitions(previous: &[UploadTask], current: &[UploadTask]) {
    let before: HashMap<&TaskId, TaskStatus> =
        previous.iter().map(|task| (&task.id, task.status)).collect();

    for task in current {
        let Some(&old) = before.get(&task.id) else {
            continue;
        };
        if old == task.status {
            continue;
        }

        if TaskStatus::is_valid_transition(old, task.status) {
            debug!(task_id = %task.id, from = %old, to = %task.status, "status changed");
        } else {
            warn!(task_id = %task.id, from = %old, to = %task.status, "unexpected status transition");
        }
    }
}

/// 会话构建器
pub struct UploadSessionBuilder {
    engine: Option<Arc<dyn UploadEngine>>,
    clock: Arc<dyn Clock>,
    stall_threshold_ms: u64,
    stall_cooldown_ms: Option<u64>,
    refresh_ordering: RefreshOrdering,
    event_capacity: usize,
}

impl Default for UploadSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSessionBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            clock: Arc::new(SystemClock),
            stall_threshold_ms: DEFAULT_STALL_THRESHOLD_MS,
            stall_cooldown_ms: None,
            refresh_ordering: RefreshOrdering::default(),
            // 最大缓存 256 个事件
            event_capacity: 256,
        }
    }

    pub fn config(mut self, config: &SyncConfig) -> Self {
        self.stall_threshold_ms = config.stall_threshold_ms;
        self.stall_cooldown_ms = config.stall_cooldown_ms;
        self.refresh_ordering = config.refresh_ordering;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn UploadEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stall_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.stall_threshold_ms = threshold_ms;
        self
    }

    pub fn stall_cooldown_ms(mut self, cooldown_ms: Option<u64>) -> Self {
        self.stall_cooldown_ms = cooldown_ms;
        self
    }

    pub fn refresh_ordering(mut self, ordering: RefreshOrdering) -> Self {
        self.refresh_ordering = ordering;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Result<UploadSession> {
        let engine = self
            .engine
            .ok_or_else(|| SyncError::Config("upload engine is required".to_string()))?;
        let (event_tx, _) = broadcast::channel(self.event_capacity);

        Ok(UploadSession {
            engine,
            clock: self.clock,
            store: TaskStore::new(self.refresh_ordering),
            estimator: SpeedEstimator::new(),
            detector: StallDetector::new(self.stall_threshold_ms, self.stall_cooldown_ms),
            event_tx,
        })
    }
}
