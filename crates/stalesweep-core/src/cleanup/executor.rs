use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{CleanupOutcome, CleanupType, DeletionFailure};
use super::policy::ThresholdPolicy;
use super::selector::ArticleSelector;
use crate::config::AppConfig;
use crate::storage::{ArticleRepository, AuditLogRepository, CleanupLogRepository, Database};
use crate::Result;

/// Orchestrates one cleanup run: lock, identify, delete, reconcile, log.
///
/// A run moves from `running` to exactly one terminal state. Per-article
/// delete failures are tallied and do not abort the batch; only the run's
/// own bookkeeping (the log row, the candidate query) can fail a run.
pub struct CleanupExecutor {
    db: Arc<Database>,
    config: Arc<AppConfig>,
}

impl CleanupExecutor {
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    fn run_timeout(&self) -> Duration {
        Duration::seconds(self.config.cleanup.run_timeout_secs as i64)
    }

    /// Delete an explicit batch of articles under a fresh run record.
    pub async fn execute_cleanup(
        &self,
        article_ids: &[Uuid],
        actor: Option<Uuid>,
        cleanup_type: CleanupType,
    ) -> Result<CleanupOutcome> {
        let policy = ThresholdPolicy::new(&self.db, &self.config.cleanup);
        let threshold_days = policy.get_threshold_days().await?;

        let logs = CleanupLogRepository::new(&self.db);
        let run_id = logs
            .try_begin_run(cleanup_type, threshold_days, actor, self.run_timeout())
            .await?;

        self.delete_and_reconcile(run_id, article_ids, actor).await
    }

    /// The admin path: identify candidates and delete them under one run.
    pub async fn trigger_manual_cleanup(
        &self,
        actor: Uuid,
        threshold_override: Option<u32>,
    ) -> Result<CleanupOutcome> {
        self.run_cleanup(CleanupType::Manual, Some(actor), threshold_override)
            .await
    }

    /// The scheduler entry point. Does nothing, and logs no run, while auto
    /// cleanup is disabled.
    pub async fn run_auto_cleanup(&self) -> Result<Option<CleanupOutcome>> {
        let policy = ThresholdPolicy::new(&self.db, &self.config.cleanup);
        if !policy.is_auto_cleanup_enabled().await? {
            debug!("Auto cleanup is disabled, skipping");
            return Ok(None);
        }

        self.run_cleanup(CleanupType::Auto, None, None).await.map(Some)
    }

    async fn run_cleanup(
        &self,
        cleanup_type: CleanupType,
        actor: Option<Uuid>,
        threshold_override: Option<u32>,
    ) -> Result<CleanupOutcome> {
        let policy = ThresholdPolicy::new(&self.db, &self.config.cleanup);
        let threshold_days = match threshold_override {
            Some(days) => days,
            None => policy.get_threshold_days().await?,
        };

        let logs = CleanupLogRepository::new(&self.db);
        let run_id = logs
            .try_begin_run(cleanup_type, threshold_days, actor, self.run_timeout())
            .await?;

        let selector = ArticleSelector::new(&self.db, &self.config.cleanup);
        let article_ids = match selector.identify_older_than(threshold_days).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Candidate identification failed, aborting cleanup run");
                if let Err(log_err) = logs.fail_run(run_id, &e.to_string()).await {
                    error!(run_id = %run_id, error = %log_err, "Could not mark cleanup run as failed");
                }
                return Err(e);
            }
        };

        info!(
            run_id = %run_id,
            candidates = article_ids.len(),
            threshold_days,
            cleanup_type = %cleanup_type,
            "Starting cleanup run"
        );

        self.delete_and_reconcile(run_id, &article_ids, actor).await
    }

    async fn delete_and_reconcile(
        &self,
        run_id: Uuid,
        article_ids: &[Uuid],
        actor: Option<Uuid>,
    ) -> Result<CleanupOutcome> {
        let articles = ArticleRepository::new(&self.db);
        let audit = AuditLogRepository::new(&self.db);
        let logs = CleanupLogRepository::new(&self.db);

        let mut deleted_ids: Vec<Uuid> = Vec::new();
        let mut errors: Vec<DeletionFailure> = Vec::new();

        for &article_id in article_ids {
            match self.delete_one(&articles, &audit, article_id, actor).await {
                Ok(()) => deleted_ids.push(article_id),
                Err(reason) => {
                    warn!(article_id = %article_id, %reason, "Failed to delete article during cleanup");
                    errors.push(DeletionFailure { article_id, reason });
                }
            }
        }

        let error_message =
            summarize_failures(&errors, self.config.cleanup.max_recorded_errors);
        let deleted_count = deleted_ids.len() as u32;

        if let Err(e) = logs
            .complete_run(run_id, deleted_count, &deleted_ids, error_message.as_deref())
            .await
        {
            error!(run_id = %run_id, error = %e, "Could not write cleanup run log entry");
            if let Err(log_err) = logs.fail_run(run_id, &e.to_string()).await {
                error!(run_id = %run_id, error = %log_err, "Could not mark cleanup run as failed");
            }
            return Err(e);
        }

        info!(
            run_id = %run_id,
            deleted = deleted_count,
            failed = errors.len(),
            "Cleanup run completed"
        );

        Ok(CleanupOutcome {
            run_id,
            success: true,
            deleted_count,
            failed_count: errors.len() as u32,
            errors,
        })
    }

    /// Delete one article and record the audit event. The returned error is
    /// a per-item failure reason, local to this article.
    async fn delete_one(
        &self,
        articles: &ArticleRepository<'_>,
        audit: &AuditLogRepository<'_>,
        article_id: Uuid,
        actor: Option<Uuid>,
    ) -> std::result::Result<(), String> {
        let article = articles
            .find_by_id(article_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "article no longer exists".to_string())?;

        if !articles.delete(article_id).await.map_err(|e| e.to_string())? {
            return Err("article no longer exists".to_string());
        }

        // The audit trail is best-effort, not tied to the delete
        let old_value = json!({
            "title": article.title,
            "status": article.status.as_str(),
            "author_id": article.author_id,
            "created_at": article.created_at,
        });
        if let Err(e) = audit
            .record_event(
                actor,
                "cleanup_delete",
                "article",
                &article_id.to_string(),
                Some(&old_value),
                None,
            )
            .await
        {
            warn!(article_id = %article_id, error = %e, "Could not record audit event for deleted article");
        }

        Ok(())
    }
}

fn summarize_failures(errors: &[DeletionFailure], limit: usize) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let summary = errors
        .iter()
        .take(limit)
        .map(|failure| format!("{}: {}", failure.article_id, failure.reason))
        .collect::<Vec<_>>()
        .join("; ");

    Some(summary)
}
