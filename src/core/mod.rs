mod errors;
mod manager;
mod progress;
mod stall;
mod store;
mod traits;
mod types;

pub use errors::{Result, SyncError};
pub use manager::{UploadSession, UploadSessionBuilder};
pub use progress::SpeedEstimator;
pub use stall::{StallDetector, DEFAULT_STALL_THRESHOLD_MS};
pub use store::{validate_snapshot, ApplyOutcome, RefreshOrdering, Snapshot, TaskStore};
pub use traits::{Clock, SystemClock, UploadEngine};
pub use types::{
    Ack, StallWarning, SubmitReceipt, SyncEvent, TaskId, TaskStatus, UploadForm, UploadTask,
    UserSummary, VideoInfo,
};

#[cfg(test)]
mod tests;
