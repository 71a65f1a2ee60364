use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// 引擎不可达或请求失败
    #[error("Transport error: {0}")]
    Transport(String),

    /// 引擎返回了非成功状态
    #[error("Engine error: status code {status_code}, message: {message}")]
    Engine {
        status_code: u16,
        message: String,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn engine(status_code: u16, message: impl Into<String>) -> Self {
        Self::Engine {
            status_code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// 是否为传输层失败（引擎不可达）
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SyncError::engine(status.as_u16(), err.to_string()),
            None => SyncError::Transport(err.to_string()),
        }
    }
}

/// Error alias
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
