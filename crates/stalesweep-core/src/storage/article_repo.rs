use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::article::{Article, ArticleStatus};
use crate::{Error, Result};

/// Read/delete access to the platform's article store. Article creation and
/// editing belong to the platform; cleanup never writes content.
pub struct ArticleRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct ArticleRow {
    id: String,
    title: String,
    author_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = Error;

    fn try_from(row: ArticleRow) -> Result<Article> {
        Ok(Article {
            id: Uuid::parse_str(&row.id)?,
            title: row.title,
            author_id: row.author_id.as_deref().map(Uuid::parse_str).transpose()?,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl<'a> ArticleRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find an article by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(
            r#"
            SELECT id, title, author_id, status, created_at, updated_at
            FROM articles
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(Article::try_from).transpose()
    }

    /// IDs of articles in any of the given statuses created before the
    /// cutoff, oldest first. An empty status set matches nothing.
    pub async fn query_by_status_and_age(
        &self,
        statuses: &[ArticleStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        // Build placeholders for IN clause
        let placeholders: Vec<String> = statuses.iter().map(|_| "?".to_string()).collect();
        let query = format!(
            "SELECT id FROM articles WHERE status IN ({}) AND created_at < ? ORDER BY created_at ASC",
            placeholders.join(", ")
        );

        let mut query_builder = sqlx::query_scalar::<_, String>(&query);
        for status in statuses {
            query_builder = query_builder.bind(status.as_str());
        }

        let rows: Vec<String> = query_builder
            .bind(older_than)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter()
            .map(|id| Uuid::parse_str(id).map_err(Error::from))
            .collect()
    }

    /// Delete an article, returning false when it was already gone
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
