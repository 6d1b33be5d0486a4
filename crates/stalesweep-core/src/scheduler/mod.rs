mod host;
mod service;

pub use host::{CronHost, CronJob, JobFuture, TokioTimerHost};
pub use service::{CleanupScheduler, AUTO_CLEANUP_HANDLE};
