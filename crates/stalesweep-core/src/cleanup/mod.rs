mod executor;
mod models;
mod policy;
mod selector;

pub use executor::CleanupExecutor;
pub use models::{
    CleanupLogFilter, CleanupLogPage, CleanupOutcome, CleanupRun, CleanupStatistics, CleanupType,
    DailyStats, DeletionFailure, RunStatus, TotalStats, TypeStats,
};
pub use policy::{ThresholdPolicy, AUTO_CLEANUP_ENABLED_KEY, THRESHOLD_DAYS_KEY};
pub use selector::ArticleSelector;
