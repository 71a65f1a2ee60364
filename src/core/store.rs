use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use super::errors::{Result, SyncError};
use super::types::{TaskId, UploadTask};

/// 并发刷新时的快照应用策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOrdering {
    /// 最后完成的请求胜出，与发起顺序无关
    LastCompleted,
    /// 丢弃比已应用快照更早发起的响应
    #[default]
    Sequenced,
}

pub type Snapshot = Arc<Vec<UploadTask>>;

#[derive(Debug)]
pub enum ApplyOutcome {
    Applied {
        previous: Snapshot,
        current: Snapshot,
    },
    Discarded {
        applied_seq: u64,
        current: Snapshot,
    },
}

struct StoreInner {
    applied_seq: u64,
    tasks: Snapshot,
}

/// 任务队列镜像：只保存最近一次完整快照，只能整体替换
pub struct TaskStore {
    ordering: RefreshOrdering,
    next_seq: AtomicU64,
    inner: RwLock<StoreInner>,
}

impl TaskStore {
    pub fn new(ordering: RefreshOrdering) -> Self {
        Self {
            ordering,
            next_seq: AtomicU64::new(0),
            inner: RwLock::new(StoreInner {
                applied_seq: 0,
                tasks: Arc::new(Vec::new()),
            }),
        }
    }

    /// 为一次快照请求分配序号，序号从 1 开始单调递增
    pub fn begin_fetch(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 用 `seq` 对应的响应整体替换镜像
    pub fn apply(&self, seq: u64, tasks: Vec<UploadTask>) -> ApplyOutcome {
        let mut inner = self.inner.write();

        if self.ordering == RefreshOrdering::Sequenced && seq < inner.applied_seq {
            return ApplyOutcome::Discarded {
                applied_seq: inner.applied_seq,
                current: Arc::clone(&inner.tasks),
            };
        }

        let current = Arc::new(tasks);
        let previous = std::mem::replace(&mut inner.tasks, Arc::clone(&current));
        inner.applied_seq = seq;

        ApplyOutcome::Applied { previous, current }
    }

    pub fn get(&self, task_id: &TaskId) -> Option<UploadTask> {
        self.inner
            .read()
            .tasks
            .iter()
            .find(|task| &task.id == task_id)
            .cloned()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.inner
            .read()
            .tasks
            .iter()
            .any(|task| task.id.as_str() == task_id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.inner.read().tasks)
    }

    pub fn len(&self) -> usize {
        self.inner.read().tasks.len()
    }

    pub fn clear(&self) {
        self.inner.write().tasks = Arc::new(Vec::new());
    }
}

/// 校验引擎返回的快照：任务本身合法且 id 唯一
pub fn validate_snapshot(tasks: &[UploadTask]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()?;
        if !seen.insert(&task.id) {
            return Err(SyncError::malformed(format!("duplicate task id in snapshot: {}", task.id)));
        }
    }
    Ok(())
}
