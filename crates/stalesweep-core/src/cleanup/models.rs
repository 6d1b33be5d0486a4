use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// How a cleanup run was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupType {
    Auto,
    Manual,
}

impl CleanupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupType::Auto => "auto",
            CleanupType::Manual => "manual",
        }
    }
}

impl fmt::Display for CleanupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanupType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(CleanupType::Auto),
            "manual" => Ok(CleanupType::Manual),
            other => Err(Error::InvalidCleanupType(other.to_string())),
        }
    }
}

/// Lifecycle state of a cleanup run. Runs move from `Running` to exactly one
/// terminal state and never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(Error::InvalidRunStatus(other.to_string())),
        }
    }
}

/// One execution of identify-and-delete, logged as a single append-only record
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRun {
    pub id: Uuid,
    pub cleanup_type: CleanupType,
    pub articles_deleted: u32,
    /// Retention threshold in effect when the run started
    pub threshold_days: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub deleted_article_ids: Vec<Uuid>,
    pub triggered_by: Option<Uuid>,
}

/// Typed filter for querying run history
#[derive(Debug, Clone)]
pub struct CleanupLogFilter {
    pub cleanup_type: Option<CleanupType>,
    pub status: Option<RunStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for CleanupLogFilter {
    fn default() -> Self {
        Self {
            cleanup_type: None,
            status: None,
            date_from: None,
            date_to: None,
            page: 1,
            per_page: 20,
        }
    }
}

/// One page of run history, most recent first
#[derive(Debug, Clone, Serialize)]
pub struct CleanupLogPage {
    pub logs: Vec<CleanupRun>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalStats {
    pub total_cleanups: u32,
    pub total_deleted: u32,
    pub successful_cleanups: u32,
    pub failed_cleanups: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeStats {
    pub cleanup_type: CleanupType,
    pub count: u32,
    pub deleted_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub cleanups: u32,
    pub deleted: u32,
}

/// Aggregates over the run history within a trailing window
#[derive(Debug, Clone, Serialize)]
pub struct CleanupStatistics {
    pub total_stats: TotalStats,
    pub type_stats: Vec<TypeStats>,
    pub daily_stats: Vec<DailyStats>,
    pub period_days: u32,
}

/// Result of a single executor invocation. `success` reflects whether the
/// run itself completed its bookkeeping, not whether every delete succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupOutcome {
    pub run_id: Uuid,
    pub success: bool,
    pub deleted_count: u32,
    pub failed_count: u32,
    pub errors: Vec<DeletionFailure>,
}

/// A per-article failure, local to the run that observed it
#[derive(Debug, Clone, Serialize)]
pub struct DeletionFailure {
    pub article_id: Uuid,
    pub reason: String,
}
