use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::query_with_retry;
use super::Database;
use crate::cleanup::{
    CleanupLogFilter, CleanupLogPage, CleanupRun, CleanupStatistics, CleanupType, DailyStats,
    TotalStats, TypeStats,
};
use crate::{Error, Result};

/// Append-only history of cleanup runs
pub struct CleanupLogRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct CleanupRunRow {
    id: String,
    cleanup_type: String,
    articles_deleted: i64,
    threshold_days: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    error_message: Option<String>,
    deleted_articles: Option<String>,
    triggered_by: Option<String>,
}

impl TryFrom<CleanupRunRow> for CleanupRun {
    type Error = Error;

    fn try_from(row: CleanupRunRow) -> Result<CleanupRun> {
        let deleted_article_ids = match row.deleted_articles {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        Ok(CleanupRun {
            id: Uuid::parse_str(&row.id)?,
            cleanup_type: row.cleanup_type.parse()?,
            articles_deleted: row.articles_deleted as u32,
            threshold_days: row.threshold_days as u32,
            started_at: row.started_at,
            completed_at: row.completed_at,
            status: row.status.parse()?,
            error_message: row.error_message,
            deleted_article_ids,
            triggered_by: row.triggered_by.as_deref().map(Uuid::parse_str).transpose()?,
        })
    }
}

const RUN_COLUMNS: &str = "id, cleanup_type, articles_deleted, threshold_days, started_at, \
                           completed_at, status, error_message, deleted_articles, triggered_by";

impl<'a> CleanupLogRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Atomically open a new run, refusing while another one is in flight.
    ///
    /// `running` rows older than `stale_after` are failed first, so a run
    /// killed mid-flight cannot hold the advisory lock forever.
    pub async fn try_begin_run(
        &self,
        cleanup_type: CleanupType,
        threshold_days: u32,
        triggered_by: Option<Uuid>,
        stale_after: Duration,
    ) -> Result<Uuid> {
        self.fail_abandoned_runs(stale_after).await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let actor = triggered_by.map(|u| u.to_string());

        let result = query_with_retry(|| async {
            sqlx::query(
                r#"
                INSERT INTO cleanup_runs
                (id, cleanup_type, articles_deleted, threshold_days, started_at, status, triggered_by)
                SELECT ?, ?, 0, ?, ?, 'running', ?
                WHERE NOT EXISTS (SELECT 1 FROM cleanup_runs WHERE status = 'running')
                "#,
            )
            .bind(id.to_string())
            .bind(cleanup_type.as_str())
            .bind(threshold_days)
            .bind(now)
            .bind(&actor)
            .execute(self.db.pool())
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::CleanupInProgress);
        }

        Ok(id)
    }

    /// Mark the run completed. The status guard makes terminal states final.
    pub async fn complete_run(
        &self,
        id: Uuid,
        articles_deleted: u32,
        deleted_ids: &[Uuid],
        error_message: Option<&str>,
    ) -> Result<()> {
        let payload = serde_json::to_string(deleted_ids)?;
        let now = Utc::now();

        let result = query_with_retry(|| async {
            sqlx::query(
                r#"
                UPDATE cleanup_runs
                SET articles_deleted = ?, completed_at = ?, status = 'completed',
                    deleted_articles = ?, error_message = ?
                WHERE id = ? AND status = 'running'
                "#,
            )
            .bind(articles_deleted)
            .bind(now)
            .bind(&payload)
            .bind(error_message)
            .bind(id.to_string())
            .execute(self.db.pool())
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RunNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Mark the run failed with an operator-facing error message.
    pub async fn fail_run(&self, id: Uuid, error_message: &str) -> Result<()> {
        let now = Utc::now();

        let result = query_with_retry(|| async {
            sqlx::query(
                r#"
                UPDATE cleanup_runs
                SET completed_at = ?, status = 'failed', error_message = ?
                WHERE id = ? AND status = 'running'
                "#,
            )
            .bind(now)
            .bind(error_message)
            .bind(id.to_string())
            .execute(self.db.pool())
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RunNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Fail `running` rows older than the timeout. A hard process kill can
    /// strand a run in `running`; such rows are abandoned, not in flight.
    pub async fn fail_abandoned_runs(&self, stale_after: Duration) -> Result<u64> {
        let cutoff = Utc::now() - stale_after;
        let now = Utc::now();

        let result = query_with_retry(|| async {
            sqlx::query(
                r#"
                UPDATE cleanup_runs
                SET completed_at = ?, status = 'failed',
                    error_message = 'abandoned: run exceeded timeout without reaching a terminal state'
                WHERE status = 'running' AND started_at < ?
                "#,
            )
            .bind(now)
            .bind(cutoff)
            .execute(self.db.pool())
            .await
        })
        .await?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            tracing::warn!(count = reaped, "Marked abandoned cleanup runs as failed");
        }

        Ok(reaped)
    }

    /// Find a cleanup run by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CleanupRun>> {
        let sql = format!("SELECT {} FROM cleanup_runs WHERE id = ?", RUN_COLUMNS);

        let row: Option<CleanupRunRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(CleanupRun::try_from).transpose()
    }

    /// Paginated run history, most recent first
    pub async fn get_cleanup_logs(&self, filter: &CleanupLogFilter) -> Result<CleanupLogPage> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(cleanup_type) = filter.cleanup_type {
            conditions.push("cleanup_type = ?");
            binds.push(cleanup_type.as_str().to_string());
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            binds.push(status.as_str().to_string());
        }
        if let Some(date_from) = filter.date_from {
            conditions.push("DATE(started_at) >= ?");
            binds.push(date_from.to_string());
        }
        if let Some(date_to) = filter.date_to {
            conditions.push("DATE(started_at) <= ?");
            binds.push(date_to.to_string());
        }

        let where_clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };

        let count_sql = format!("SELECT COUNT(*) FROM cleanup_runs WHERE {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value);
        }
        let total = count_query.fetch_one(self.db.pool()).await? as u32;

        let page = filter.page.max(1);
        let per_page = filter.per_page.max(1);
        let offset = (page - 1) * per_page;

        let rows_sql = format!(
            "SELECT {} FROM cleanup_runs WHERE {} ORDER BY started_at DESC LIMIT ? OFFSET ?",
            RUN_COLUMNS, where_clause
        );
        let mut rows_query = sqlx::query_as::<_, CleanupRunRow>(&rows_sql);
        for value in &binds {
            rows_query = rows_query.bind(value);
        }
        let rows: Vec<CleanupRunRow> = rows_query
            .bind(per_page)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        let logs = rows
            .into_iter()
            .map(CleanupRun::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(CleanupLogPage {
            logs,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        })
    }

    /// Aggregate statistics over runs started within the trailing window
    pub async fn get_cleanup_statistics(&self, period_days: u32) -> Result<CleanupStatistics> {
        let date_from = (Utc::now() - Duration::days(period_days as i64)).date_naive();

        let (total_cleanups, total_deleted, successful_cleanups, failed_cleanups): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(articles_deleted), 0),
                   COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
            FROM cleanup_runs
            WHERE DATE(started_at) >= ?
            "#,
        )
        .bind(date_from)
        .fetch_one(self.db.pool())
        .await?;

        let type_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT cleanup_type, COUNT(*), COALESCE(SUM(articles_deleted), 0)
            FROM cleanup_runs
            WHERE DATE(started_at) >= ?
            GROUP BY cleanup_type
            "#,
        )
        .bind(date_from)
        .fetch_all(self.db.pool())
        .await?;

        let type_stats = type_rows
            .into_iter()
            .map(|(cleanup_type, count, deleted_count)| {
                Ok(TypeStats {
                    cleanup_type: cleanup_type.parse::<CleanupType>()?,
                    count: count as u32,
                    deleted_count: deleted_count as u32,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let daily_rows: Vec<(NaiveDate, i64, i64)> = sqlx::query_as(
            r#"
            SELECT DATE(started_at), COUNT(*), COALESCE(SUM(articles_deleted), 0)
            FROM cleanup_runs
            WHERE DATE(started_at) >= ?
            GROUP BY DATE(started_at)
            ORDER BY DATE(started_at) DESC
            "#,
        )
        .bind(date_from)
        .fetch_all(self.db.pool())
        .await?;

        let daily_stats = daily_rows
            .into_iter()
            .map(|(date, cleanups, deleted)| DailyStats {
                date,
                cleanups: cleanups as u32,
                deleted: deleted as u32,
            })
            .collect();

        Ok(CleanupStatistics {
            total_stats: TotalStats {
                total_cleanups: total_cleanups as u32,
                total_deleted: total_deleted as u32,
                successful_cleanups: successful_cleanups as u32,
                failed_cleanups: failed_cleanups as u32,
            },
            type_stats,
            daily_stats,
            period_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::RunStatus;

    fn stale_after() -> Duration {
        Duration::hours(1)
    }

    async fn backdate_run(db: &Database, id: Uuid, days_ago: i64) {
        let ts = Utc::now() - Duration::days(days_ago);
        sqlx::query("UPDATE cleanup_runs SET started_at = ? WHERE id = ?")
            .bind(ts)
            .bind(id.to_string())
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn begin_and_complete_round_trips() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);
        let actor = Uuid::new_v4();
        let deleted = vec![Uuid::new_v4(), Uuid::new_v4()];

        let run_id = repo
            .try_begin_run(CleanupType::Manual, 30, Some(actor), stale_after())
            .await
            .unwrap();
        repo.complete_run(run_id, 2, &deleted, None).await.unwrap();

        let run = repo.find_by_id(run_id).await.unwrap().unwrap();
        assert_eq!(run.cleanup_type, CleanupType::Manual);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.articles_deleted, 2);
        assert_eq!(run.threshold_days, 30);
        assert_eq!(run.deleted_article_ids, deleted);
        assert_eq!(run.triggered_by, Some(actor));
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn second_begin_is_refused_while_running() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let first = repo
            .try_begin_run(CleanupType::Auto, 30, None, stale_after())
            .await
            .unwrap();

        let second = repo
            .try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await;
        assert!(matches!(second, Err(Error::CleanupInProgress)));

        // The lock clears once the first run reaches a terminal state
        repo.complete_run(first, 0, &[], None).await.unwrap();
        repo.try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn abandoned_runs_release_the_lock() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let stranded = repo
            .try_begin_run(CleanupType::Auto, 30, None, stale_after())
            .await
            .unwrap();
        backdate_run(&db, stranded, 1).await;

        let run_id = repo
            .try_begin_run(CleanupType::Auto, 30, None, stale_after())
            .await
            .unwrap();
        assert_ne!(run_id, stranded);

        let old = repo.find_by_id(stranded).await.unwrap().unwrap();
        assert_eq!(old.status, RunStatus::Failed);
        assert!(old.error_message.unwrap().contains("abandoned"));
    }

    #[tokio::test]
    async fn terminal_runs_are_immutable() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let run_id = repo
            .try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await
            .unwrap();
        repo.complete_run(run_id, 0, &[], None).await.unwrap();

        let again = repo.complete_run(run_id, 5, &[], None).await;
        assert!(matches!(again, Err(Error::RunNotFound(_))));
        let failed = repo.fail_run(run_id, "late failure").await;
        assert!(matches!(failed, Err(Error::RunNotFound(_))));
    }

    #[tokio::test]
    async fn logs_are_paginated_most_recent_first() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let mut ids = Vec::new();
        for days_ago in [3, 2, 1] {
            let id = repo
                .try_begin_run(CleanupType::Auto, 30, None, stale_after())
                .await
                .unwrap();
            repo.complete_run(id, 0, &[], None).await.unwrap();
            backdate_run(&db, id, days_ago).await;
            ids.push(id);
        }

        let page = repo
            .get_cleanup_logs(&CleanupLogFilter {
                per_page: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.logs.len(), 2);
        // Created 3, 2, 1 days ago; most recent first
        assert_eq!(page.logs[0].id, ids[2]);
        assert_eq!(page.logs[1].id, ids[1]);

        let last = repo
            .get_cleanup_logs(&CleanupLogFilter {
                page: 2,
                per_page: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(last.logs.len(), 1);
        assert_eq!(last.logs[0].id, ids[0]);
    }

    #[tokio::test]
    async fn logs_filter_by_type_and_status() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let auto_ok = repo
            .try_begin_run(CleanupType::Auto, 30, None, stale_after())
            .await
            .unwrap();
        repo.complete_run(auto_ok, 1, &[Uuid::new_v4()], None)
            .await
            .unwrap();

        let manual_failed = repo
            .try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await
            .unwrap();
        repo.fail_run(manual_failed, "store unreachable").await.unwrap();

        let autos = repo
            .get_cleanup_logs(&CleanupLogFilter {
                cleanup_type: Some(CleanupType::Auto),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(autos.total, 1);
        assert_eq!(autos.logs[0].id, auto_ok);

        let failures = repo
            .get_cleanup_logs(&CleanupLogFilter {
                status: Some(RunStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failures.total, 1);
        assert_eq!(failures.logs[0].id, manual_failed);
    }

    #[tokio::test]
    async fn statistics_reconcile_and_respect_the_window() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(&db);

        let completed = repo
            .try_begin_run(CleanupType::Auto, 30, None, stale_after())
            .await
            .unwrap();
        repo.complete_run(completed, 3, &[Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()], None)
            .await
            .unwrap();

        let failed = repo
            .try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await
            .unwrap();
        repo.fail_run(failed, "store unreachable").await.unwrap();

        // Outside the 30-day window
        let ancient = repo
            .try_begin_run(CleanupType::Manual, 30, None, stale_after())
            .await
            .unwrap();
        repo.complete_run(ancient, 9, &[], None).await.unwrap();
        backdate_run(&db, ancient, 40).await;

        let stats = repo.get_cleanup_statistics(30).await.unwrap();
        let totals = &stats.total_stats;

        assert_eq!(totals.total_cleanups, 2);
        assert_eq!(totals.total_deleted, 3);
        assert_eq!(
            totals.total_cleanups,
            totals.successful_cleanups + totals.failed_cleanups
        );

        assert_eq!(stats.type_stats.len(), 2);
        let auto = stats
            .type_stats
            .iter()
            .find(|t| t.cleanup_type == CleanupType::Auto)
            .unwrap();
        assert_eq!(auto.count, 1);
        assert_eq!(auto.deleted_count, 3);

        assert_eq!(stats.daily_stats.len(), 1);
        assert_eq!(stats.daily_stats[0].cleanups, 2);
        assert_eq!(stats.daily_stats[0].deleted, 3);
        assert_eq!(stats.period_days, 30);
    }
}
