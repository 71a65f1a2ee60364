use std::fs;
use std::path::Path;
use serde::Deserialize;
use crate::core::{RefreshOrdering, Result, SyncError, DEFAULT_STALL_THRESHOLD_MS};

fn default_stall_threshold_ms() -> u64 {
    DEFAULT_STALL_THRESHOLD_MS
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Deserialize, Debug, Clone)]
pub struct SyncConfig {
    /// 上传引擎地址
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    /// 请求超时（秒），不设置则不超时
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_stall_threshold_ms")]
    pub stall_threshold_ms: u64,
    /// 同一任务两次停滞重试的最小间隔
    #[serde(default)]
    pub stall_cooldown_ms: Option<u64>,
    #[serde(default)]
    pub refresh_ordering: RefreshOrdering,
    /// 仅供开发用的轮询程序使用
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl SyncConfig {
    pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(source: &str) -> Result<SyncConfig> {
        let config: SyncConfig =
            toml::from_str(source).map_err(|err| SyncError::Config(err.to_string()))?;

        if config.endpoint.trim().is_empty() {
            return Err(SyncError::Config("endpoint must not be empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_toml(r#"endpoint = "http://127.0.0.1:9527""#).unwrap();
        assert!(config.endpoint.starts_with("http"));
        assert_eq!(config.stall_threshold_ms, 30_000);
        assert_eq!(config.stall_cooldown_ms, None);
        assert_eq!(config.refresh_ordering, RefreshOrdering::Sequenced);
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = SyncConfig::from_toml(
            r#"
            endpoint = "http://engine.local/api"
            token = "secret"
            request_timeout_secs = 15
            stall_threshold_ms = 45000
            stall_cooldown_ms = 60000
            refresh_ordering = "last_completed"
            "#,
        )
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout_secs, Some(15));
        assert_eq!(config.stall_threshold_ms, 45_000);
        assert_eq!(config.stall_cooldown_ms, Some(60_000));
        assert_eq!(config.refresh_ordering, RefreshOrdering::LastCompleted);
    }

    #[test]
    fn test_rejects_missing_endpoint() {
        assert!(matches!(SyncConfig::from_toml("token = \"x\""), Err(SyncError::Config(_))));
        assert!(matches!(SyncConfig::from_toml("endpoint = \"  \""), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SyncConfig::load_config("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
