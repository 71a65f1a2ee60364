use std::collections::{HashMap, HashSet};
use parking_lot::Mutex;
use super::types::{StallWarning, TaskId, UploadTask};

pub const DEFAULT_STALL_THRESHOLD_MS: u64 = 30_000;

/// 停滞检测器
///
/// 同时满足以下条件的任务视为停滞：已开始、`Running`、推算速度为 0、
/// 开始后经过的时间严格大于阈值。
pub struct StallDetector {
    threshold_ms: u64,
    cooldown_ms: Option<u64>,
    /// 最近一次恢复重试的时间，仅在配置了冷却时间时使用
    last_retry: Mutex<HashMap<TaskId, u64>>,
}

impl Default for StallDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STALL_THRESHOLD_MS, None)
    }
}

impl StallDetector {
    pub fn new(threshold_ms: u64, cooldown_ms: Option<u64>) -> Self {
        Self {
            threshold_ms,
            cooldown_ms,
            last_retry: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_stalled(&self, task: &UploadTask, now_ms: u64) -> bool {
        let Some(elapsed) = task.elapsed_ms(now_ms) else {
            return false;
        };

        task.is_running() && task.speed == 0.0 && elapsed > self.threshold_ms
    }

    /// 扫描已估算过速度的快照，按快照顺序返回告警
    pub fn scan(&self, tasks: &[UploadTask], now_ms: u64) -> Vec<StallWarning> {
        tasks
            .iter()
            .filter(|task| self.is_stalled(task, now_ms))
            .map(|task| StallWarning {
                task_id: task.id.clone(),
                username: task.user.username.clone(),
                video_title: task.video.title.clone(),
                idle_ms: task.elapsed_ms(now_ms).unwrap_or_default(),
                threshold_ms: self.threshold_ms,
            })
            .collect()
    }

    /// 冷却期内不再重复重试；未配置冷却时总是重试
    pub fn should_retry(&self, task_id: &TaskId, now_ms: u64) -> bool {
        let Some(cooldown) = self.cooldown_ms else {
            return true;
        };

        match self.last_retry.lock().get(task_id) {
            Some(&last) => now_ms.saturating_sub(last) >= cooldown,
            None => true,
        }
    }

    pub fn record_retry(&self, task_id: &TaskId, now_ms: u64) {
        if self.cooldown_ms.is_some() {
            self.last_retry.lock().insert(task_id.clone(), now_ms);
        }
    }

    /// 清理已不在快照中的任务记录
    pub fn retain_present(&self, tasks: &[UploadTask]) {
        let present: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        self.last_retry.lock().retain(|id, _| present.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TaskStatus, UserSummary, VideoInfo};

    const NOW: u64 = 10_000_000;

    fn stuck(elapsed: u64) -> UploadTask {
        let user = UserSummary { uid: 7, username: "bob".into(), avatar: String::new() };
        let mut task = UploadTask::new("a", "tmpl", user, VideoInfo::new("a", "holiday"));
        task.status = TaskStatus::Running;
        task.started_at = Some(NOW - elapsed);
        task
    }

    #[test]
    fn test_fires_only_when_all_conditions_hold() {
        let detector = StallDetector::default();

        assert!(detector.is_stalled(&stuck(30_001), NOW));
        assert!(!detector.is_stalled(&stuck(30_000), NOW));
        assert!(!detector.is_stalled(&stuck(29_999), NOW));

        let mut moving = stuck(40_000);
        moving.speed = 1.0;
        assert!(!detector.is_stalled(&moving, NOW));

        let mut paused = stuck(40_000);
        paused.status = TaskStatus::Paused;
        assert!(!detector.is_stalled(&paused, NOW));

        let mut unstarted = stuck(40_000);
        unstarted.started_at = None;
        assert!(!detector.is_stalled(&unstarted, NOW));
    }

    #[test]
    fn test_scan_builds_warning() {
        let detector = StallDetector::default();
        let warnings = detector.scan(&[stuck(40_000), stuck(1_000)], NOW);

        assert_eq!(warnings.len(), 1);
        let warning = &warnings[0];
        assert_eq!(warning.task_id, TaskId::from("a"));
        assert_eq!(warning.idle_ms, 40_000);
        assert!(warning.message().contains("bob-holiday"));
        assert!(warning.message().contains("30 seconds"));
    }

    #[test]
    fn test_without_cooldown_always_retries() {
        let detector = StallDetector::default();
        let id = TaskId::from("a");
        detector.record_retry(&id, NOW);
        assert!(detector.should_retry(&id, NOW + 1));
    }

    #[test]
    fn test_cooldown_suppresses_repeat_retry() {
        let detector = StallDetector::new(DEFAULT_STALL_THRESHOLD_MS, Some(60_000));
        let id = TaskId::from("a");

        assert!(detector.should_retry(&id, NOW));
        detector.record_retry(&id, NOW);
        assert!(!detector.should_retry(&id, NOW + 59_999));
        assert!(detector.should_retry(&id, NOW + 60_000));

        detector.retain_present(&[]);
        assert!(detector.should_retry(&id, NOW + 1));
    }
}
