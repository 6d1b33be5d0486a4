use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::{Error, Result};

/// Append-only sink for audit events
pub struct AuditLogRepository<'a> {
    db: &'a Database,
}

/// A recorded audit event
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub id: i64,
    pub actor: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AuditEventRow {
    id: i64,
    actor: Option<String>,
    action: String,
    resource_type: String,
    resource_id: String,
    old_value: Option<String>,
    new_value: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditEventRow> for AuditEvent {
    type Error = Error;

    fn try_from(row: AuditEventRow) -> Result<AuditEvent> {
        Ok(AuditEvent {
            id: row.id,
            actor: row.actor.as_deref().map(Uuid::parse_str).transpose()?,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            old_value: row.old_value.as_deref().map(serde_json::from_str).transpose()?,
            new_value: row.new_value.as_deref().map(serde_json::from_str).transpose()?,
            created_at: row.created_at,
        })
    }
}

impl<'a> AuditLogRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a single audit event. Old and new values are stored as JSON.
    pub async fn record_event(
        &self,
        actor: Option<Uuid>,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        old_value: Option<&serde_json::Value>,
        new_value: Option<&serde_json::Value>,
    ) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor, action, resource_type, resource_id, old_value, new_value, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(actor.map(|u| u.to_string()))
        .bind(action)
        .bind(resource_type)
        .bind(resource_id)
        .bind(old_value.map(|v| v.to_string()))
        .bind(new_value.map(|v| v.to_string()))
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Events recorded against one resource, oldest first
    pub async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEvent>> {
        let rows: Vec<AuditEventRow> = sqlx::query_as(
            r#"
            SELECT id, actor, action, resource_type, resource_id, old_value, new_value, created_at
            FROM audit_logs
            WHERE resource_type = ? AND resource_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }
}
