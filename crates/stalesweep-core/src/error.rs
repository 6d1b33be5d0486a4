use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid id: {0}")]
    InvalidId(#[from] uuid::Error),

    #[error("Unknown article status: {0}")]
    InvalidArticleStatus(String),

    #[error("Unknown cleanup type: {0}")]
    InvalidCleanupType(String),

    #[error("Unknown cleanup run status: {0}")]
    InvalidRunStatus(String),

    #[error("Another cleanup run is already in progress")]
    CleanupInProgress,

    #[error("Cleanup run not found: {0}")]
    RunNotFound(String),

    #[error("Scheduling error: {0}")]
    Scheduling(String),
}

pub type Result<T> = std::result::Result<T, Error>;
