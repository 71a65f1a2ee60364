pub mod config;
pub mod core;
pub mod engine;
pub mod utils;

// 重新导出核心类型
pub use core::{
    Ack,
    Clock,
    RefreshOrdering,
    Result,
    Snapshot,
    SubmitReceipt,
    SyncError,
    SyncEvent,
    SystemClock,
    TaskId,
    TaskStatus,
    UploadEngine,
    UploadForm,
    UploadSession,
    UploadSessionBuilder,
    UploadTask,
    UserSummary,
    VideoInfo,
};

pub use config::SyncConfig;
pub use engine::HttpEngine;
