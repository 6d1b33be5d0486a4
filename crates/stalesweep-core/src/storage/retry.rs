//! Shared retry logic for SQLite write contention
//!
//! The admin CLI and the scheduler daemon may hold the same database file
//! open at the same time. Run bookkeeping writes must not be lost to a
//! transient lock, so they retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

/// Maximum number of retry attempts for database operations
pub const MAX_RETRIES: u32 = 5;

/// Check if a SQLite error is transient lock contention worth retrying
///
/// This includes:
/// - SQLITE_BUSY (5): database locked by another connection
/// - SQLITE_LOCKED (6): a table is locked
/// - SQLITE_BUSY_SNAPSHOT (1032): busy due to WAL snapshot (5 | 4<<8)
pub fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string());
            matches!(
                code.as_deref(),
                Some("5")     // SQLITE_BUSY
                | Some("6")   // SQLITE_LOCKED
                | Some("1032") // SQLITE_BUSY_SNAPSHOT
            )
        }
        _ => false,
    }
}

/// Calculate exponential backoff delay for retry attempt
///
/// Base delay: 200ms, doubling each attempt
/// Delays: 200ms, 400ms, 800ms, 1600ms, 3200ms
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(200 * 2u64.pow(attempt.saturating_sub(1)))
}

/// Execute a query operation with exponential backoff retry for transient
/// errors. Generic over the return type T to support various result types.
pub async fn query_with_retry<F, Fut, T>(operation: F) -> std::result::Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if is_transient_error(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    error = %e,
                    attempt = attempts,
                    max_retries = MAX_RETRIES,
                    delay_ms = delay.as_millis(),
                    "Database transient error, retrying operation"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
        assert_eq!(backoff_delay(4), Duration::from_millis(1600));
        assert_eq!(backoff_delay(5), Duration::from_millis(3200));
    }

    #[test]
    fn non_database_errors_are_not_transient() {
        assert!(!is_transient_error(&sqlx::Error::RowNotFound));
    }
}
