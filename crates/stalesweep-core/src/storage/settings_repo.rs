use chrono::Utc;

use super::Database;
use crate::Result;

/// Key/value store for persisted runtime settings
pub struct SettingsRepository<'a> {
    db: &'a Database,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|(value,)| value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let db = Database::new_in_memory().await.unwrap();
        let settings = SettingsRepository::new(&db);

        assert_eq!(settings.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let db = Database::new_in_memory().await.unwrap();
        let settings = SettingsRepository::new(&db);

        settings.set("cleanup_threshold_days", "14").await.unwrap();
        assert_eq!(
            settings.get("cleanup_threshold_days").await.unwrap(),
            Some("14".to_string())
        );
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let db = Database::new_in_memory().await.unwrap();
        let settings = SettingsRepository::new(&db);

        settings.set("auto_cleanup_enabled", "true").await.unwrap();
        settings.set("auto_cleanup_enabled", "false").await.unwrap();
        assert_eq!(
            settings.get("auto_cleanup_enabled").await.unwrap(),
            Some("false".to_string())
        );
    }
}
