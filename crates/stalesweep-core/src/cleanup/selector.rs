use chrono::{Duration, Utc};
use uuid::Uuid;

use super::policy::ThresholdPolicy;
use crate::config::CleanupConfig;
use crate::storage::{ArticleRepository, Database};
use crate::Result;

/// Computes cleanup candidates fresh from the article store on every call.
/// No caching: identification always reflects the latest committed state.
pub struct ArticleSelector<'a> {
    articles: ArticleRepository<'a>,
    policy: ThresholdPolicy<'a>,
}

impl<'a> ArticleSelector<'a> {
    pub fn new(db: &'a Database, config: &'a CleanupConfig) -> Self {
        Self {
            articles: ArticleRepository::new(db),
            policy: ThresholdPolicy::new(db, config),
        }
    }

    /// IDs of eligible articles strictly older than the current threshold,
    /// oldest first.
    pub async fn identify_articles_for_cleanup(&self) -> Result<Vec<Uuid>> {
        let threshold_days = self.policy.get_threshold_days().await?;
        self.identify_older_than(threshold_days).await
    }

    /// Same, with an explicit threshold. Manual runs may override the
    /// persisted policy for a one-off sweep.
    pub async fn identify_older_than(&self, threshold_days: u32) -> Result<Vec<Uuid>> {
        let statuses = self.policy.eligible_statuses()?;
        let cutoff = Utc::now() - Duration::days(threshold_days as i64);
        self.articles.query_by_status_and_age(&statuses, cutoff).await
    }
}
