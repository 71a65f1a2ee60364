use std::time::Duration;
use crate::core::UploadTask;

/// 格式化字节数
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const UNIT_SIZE: f64 = 1024.0;

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 格式化速度
pub fn format_speed(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return format!("{}/s", format_bytes(0));
    }
    format!("{}/s", format_bytes(bytes_per_second as u64))
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// 按当前推算速度估计剩余时间；速度为 0 时无法估计
pub fn estimate_eta(task: &UploadTask) -> Option<Duration> {
    if task.speed <= 0.0 || task.total_size == 0 {
        return None;
    }

    let remaining = task.total_size as f64 * (100.0 - task.progress).max(0.0) / 100.0;
    // 速度极小时结果可能超出 Duration 的表示范围
    Duration::try_from_secs_f64(remaining / task.speed).ok()
}
