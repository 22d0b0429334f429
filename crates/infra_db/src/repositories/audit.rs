//! Audit trail, notification and user directory repositories

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const EVENT_COLUMNS: &str = r#"
    id, actor_id, actor_name, actor_role, actor_dealer_id, action,
    entity_type, entity_id, entity_name, before_state, after_state,
    audience_dealer_id, audience_customer_user_id, occurred_at
"#;

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, kind, link, is_read, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Database row for an audit event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEventRow {
    pub id: Uuid,
    pub actor_id: i64,
    pub actor_name: String,
    pub actor_role: String,
    pub actor_dealer_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub audience_dealer_id: Option<i64>,
    pub audience_customer_user_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    pub dealer_id: Option<i64>,
}

/// Append-only access to `audit_events`
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &AuditEventRow) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO audit_events ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            EVENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(row.id)
            .bind(row.actor_id)
            .bind(&row.actor_name)
            .bind(&row.actor_role)
            .bind(row.actor_dealer_id)
            .bind(&row.action)
            .bind(&row.entity_type)
            .bind(&row.entity_id)
            .bind(&row.entity_name)
            .bind(&row.before_state)
            .bind(&row.after_state)
            .bind(row.audience_dealer_id)
            .bind(row.audience_customer_user_id)
            .bind(row.occurred_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM audit_events \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY occurred_at, id",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, AuditEventRow>(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<AuditEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM audit_events ORDER BY occurred_at DESC, id DESC LIMIT $1",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, AuditEventRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM audit_events WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Access to `notifications`
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts all rows in one transaction
    pub async fn insert_batch(&self, rows: &[NotificationRow]) -> Result<usize, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO notifications ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            NOTIFICATION_COLUMNS
        );

        for row in rows {
            sqlx::query(&sql)
                .bind(row.id)
                .bind(row.user_id)
                .bind(&row.title)
                .bind(&row.message)
                .bind(row.kind)
                .bind(&row.link)
                .bind(row.is_read)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(rows.len())
    }

    pub async fn list_for_user(&self, user_id: i64, unread_only: bool) -> Result<Vec<NotificationRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM notifications \
             WHERE user_id = $1 AND (NOT $2 OR NOT is_read) \
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Marks one notification read if it belongs to the user
    pub async fn mark_read(&self, user_id: i64, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Notification", id));
        }
        Ok(())
    }
}

/// Read access to the identity provider's `users` table
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn active_with_roles(&self, roles: &[String]) -> Result<Vec<UserRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, role, active, dealer_id
            FROM users
            WHERE active AND role = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(roles)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn active_of_dealer(&self, dealer_id: i64) -> Result<Vec<UserRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, role, active, dealer_id
            FROM users
            WHERE active AND dealer_id = $1
            ORDER BY id
            "#,
        )
        .bind(dealer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Adds a user row; the engine itself never writes users, test
    /// harnesses and seeders do
    pub async fn insert(&self, row: &UserRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, role, active, dealer_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(&row.display_name)
        .bind(&row.role)
        .bind(row.active)
        .bind(row.dealer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
