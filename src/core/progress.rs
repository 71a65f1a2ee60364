use super::types::UploadTask;

/// 速度估算器
///
/// 速度只由 `total_transmit_bytes` 与 `started_at` 推算，是纯展示/检测用途的临时值。
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedEstimator;

impl SpeedEstimator {
    pub fn new() -> Self {
        Self
    }

    /// 计算单个任务的平均速度（字节/秒）
    pub fn estimate(&self, task: &UploadTask, now_ms: u64) -> f64 {
        if !task.is_running() {
            return 0.0;
        }

        match task.elapsed_ms(now_ms) {
            Some(elapsed) if elapsed > 0 => {
                (task.total_transmit_bytes as f64 * 1000.0) / elapsed as f64
            }
            _ => 0.0,
        }
    }

    /// 覆盖快照中每个任务的速度
    pub fn annotate(&self, tasks: &mut [UploadTask], now_ms: u64) {
        for task in tasks.iter_mut() {
            task.speed = self.estimate(task, now_ms);
        }
    }
}
