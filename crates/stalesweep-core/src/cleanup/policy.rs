use tracing::warn;

use crate::article::ArticleStatus;
use crate::config::CleanupConfig;
use crate::storage::{Database, SettingsRepository};
use crate::Result;

pub const THRESHOLD_DAYS_KEY: &str = "cleanup_threshold_days";
pub const AUTO_CLEANUP_ENABLED_KEY: &str = "auto_cleanup_enabled";

/// Retention policy: the age threshold and the auto-cleanup flag. Live
/// values persist in the settings store; the config file supplies defaults.
pub struct ThresholdPolicy<'a> {
    settings: SettingsRepository<'a>,
    config: &'a CleanupConfig,
}

impl<'a> ThresholdPolicy<'a> {
    pub fn new(db: &'a Database, config: &'a CleanupConfig) -> Self {
        Self {
            settings: SettingsRepository::new(db),
            config,
        }
    }

    /// Persist a new retention threshold. Values below one day are rejected
    /// without touching the stored value.
    pub async fn set_threshold_days(&self, days: i64) -> Result<bool> {
        if days < 1 {
            return Ok(false);
        }

        self.settings
            .set(THRESHOLD_DAYS_KEY, &days.to_string())
            .await?;
        Ok(true)
    }

    pub async fn get_threshold_days(&self) -> Result<u32> {
        match self.settings.get(THRESHOLD_DAYS_KEY).await? {
            Some(raw) => match raw.parse::<u32>() {
                Ok(days) if days > 0 => Ok(days),
                _ => {
                    warn!(value = %raw, "Stored cleanup threshold is invalid, using default");
                    Ok(self.config.default_threshold_days)
                }
            },
            None => Ok(self.config.default_threshold_days),
        }
    }

    pub async fn enable_auto_cleanup(&self) -> Result<()> {
        self.settings.set(AUTO_CLEANUP_ENABLED_KEY, "true").await
    }

    pub async fn disable_auto_cleanup(&self) -> Result<()> {
        self.settings.set(AUTO_CLEANUP_ENABLED_KEY, "false").await
    }

    pub async fn is_auto_cleanup_enabled(&self) -> Result<bool> {
        let value = self.settings.get(AUTO_CLEANUP_ENABLED_KEY).await?;
        Ok(value.as_deref() == Some("true"))
    }

    /// Statuses eligible for cleanup. Only drafts and rejected articles are
    /// swept by default; the set is configurable so operators can opt
    /// archived content in. Published content is never listed by default.
    pub fn eligible_statuses(&self) -> Result<Vec<ArticleStatus>> {
        self.config
            .eligible_statuses
            .iter()
            .map(|s| s.parse())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CleanupConfig {
        CleanupConfig::default()
    }

    #[tokio::test]
    async fn threshold_defaults_until_set() {
        let db = Database::new_in_memory().await.unwrap();
        let cfg = config();
        let policy = ThresholdPolicy::new(&db, &cfg);

        assert_eq!(policy.get_threshold_days().await.unwrap(), 30);

        assert!(policy.set_threshold_days(45).await.unwrap());
        assert_eq!(policy.get_threshold_days().await.unwrap(), 45);
    }

    #[tokio::test]
    async fn non_positive_thresholds_are_rejected_without_mutation() {
        let db = Database::new_in_memory().await.unwrap();
        let cfg = config();
        let policy = ThresholdPolicy::new(&db, &cfg);

        assert!(policy.set_threshold_days(15).await.unwrap());

        for invalid in [0, -1, -30] {
            assert!(!policy.set_threshold_days(invalid).await.unwrap());
            assert_eq!(policy.get_threshold_days().await.unwrap(), 15);
        }
    }

    #[tokio::test]
    async fn garbage_stored_threshold_falls_back_to_default() {
        let db = Database::new_in_memory().await.unwrap();
        let cfg = config();
        let policy = ThresholdPolicy::new(&db, &cfg);

        let settings = SettingsRepository::new(&db);
        settings.set(THRESHOLD_DAYS_KEY, "not-a-number").await.unwrap();

        assert_eq!(policy.get_threshold_days().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn auto_cleanup_flag_toggles_idempotently() {
        let db = Database::new_in_memory().await.unwrap();
        let cfg = config();
        let policy = ThresholdPolicy::new(&db, &cfg);

        assert!(!policy.is_auto_cleanup_enabled().await.unwrap());

        policy.enable_auto_cleanup().await.unwrap();
        policy.enable_auto_cleanup().await.unwrap();
        assert!(policy.is_auto_cleanup_enabled().await.unwrap());

        policy.disable_auto_cleanup().await.unwrap();
        policy.disable_auto_cleanup().await.unwrap();
        assert!(!policy.is_auto_cleanup_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn eligible_statuses_parse_from_config() {
        let db = Database::new_in_memory().await.unwrap();
        let cfg = config();
        let policy = ThresholdPolicy::new(&db, &cfg);

        use crate::article::ArticleStatus;
        assert_eq!(
            policy.eligible_statuses().unwrap(),
            vec![ArticleStatus::Draft, ArticleStatus::Rejected]
        );

        let bad = CleanupConfig {
            eligible_statuses: vec!["draft".to_string(), "bogus".to_string()],
            ..CleanupConfig::default()
        };
        let policy = ThresholdPolicy::new(&db, &bad);
        assert!(policy.eligible_statuses().is_err());
    }
}
