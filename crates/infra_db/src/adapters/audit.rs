//! PostgreSQL adapters for the audit trail, notifications and user directory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    Actor, AuditEventId, DealerId, DomainPort, HealthCheckResult, HealthCheckable, NotificationId,
    PortError, Role, UserId,
};
use domain_audit::{
    AuditAction, AuditEvent, AuditStore, Audience, DirectoryUser, EntityRef, Notification,
    NotificationStore, NotificationType, UserDirectory,
};

use crate::error::DatabaseError;
use crate::repositories::audit::{
    AuditEventRow, AuditRepository, NotificationKind, NotificationRepository, NotificationRow,
    UserRepository, UserRow,
};

// ============================================================================
// Audit trail
// ============================================================================

/// PostgreSQL-backed [`AuditStore`]
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    repository: AuditRepository,
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AuditRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresAuditStore {}

#[async_trait]
impl HealthCheckable for PostgresAuditStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-audit-store").await
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    #[instrument(skip_all, fields(action = %event.action.as_str()))]
    async fn insert(&self, event: &AuditEvent) -> Result<(), PortError> {
        self.repository.insert(&event_to_row(event)).await?;
        Ok(())
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, PortError> {
        let rows = self.repository.list_for_entity(entity_type, entity_id).await?;
        Ok(rows
            .into_iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, DatabaseError>>()?)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditEvent>, PortError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.repository.list_recent(limit).await?;
        Ok(rows
            .into_iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, DatabaseError>>()?)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError> {
        Ok(self.repository.purge_before(cutoff).await?)
    }
}

fn event_to_row(event: &AuditEvent) -> AuditEventRow {
    AuditEventRow {
        id: *event.id.as_uuid(),
        actor_id: event.actor.id.value(),
        actor_name: event.actor.display_name.clone(),
        actor_role: event.actor.role.as_str().to_string(),
        actor_dealer_id: event.actor.dealer_id.map(|d| d.value()),
        action: event.action.as_str().to_string(),
        entity_type: event.entity.entity_type.clone(),
        entity_id: event.entity.entity_id.clone(),
        entity_name: event.entity.entity_name.clone(),
        before_state: event.before.clone(),
        after_state: event.after.clone(),
        audience_dealer_id: event.audience.dealer_id.map(|d| d.value()),
        audience_customer_user_id: event.audience.customer_user_id.map(|u| u.value()),
        occurred_at: event.occurred_at,
    }
}

fn row_to_event(row: AuditEventRow) -> Result<AuditEvent, DatabaseError> {
    let role: Role = row
        .actor_role
        .parse()
        .map_err(|e: String| DatabaseError::decode("actor_role", e))?;
    let action = AuditAction::parse(&row.action)
        .ok_or_else(|| DatabaseError::decode("action", format!("unknown action '{}'", row.action)))?;

    Ok(AuditEvent {
        id: AuditEventId::from_uuid(row.id),
        actor: Actor {
            id: UserId::new(row.actor_id),
            display_name: row.actor_name,
            role,
            dealer_id: row.actor_dealer_id.map(DealerId::new),
        },
        action,
        entity: EntityRef::new(row.entity_type, row.entity_id, row.entity_name),
        before: row.before_state,
        after: row.after_state,
        audience: Audience {
            dealer_id: row.audience_dealer_id.map(DealerId::new),
            customer_user_id: row.audience_customer_user_id.map(UserId::new),
        },
        occurred_at: row.occurred_at,
    })
}

// ============================================================================
// Notifications
// ============================================================================

/// PostgreSQL-backed [`NotificationStore`]
#[derive(Debug, Clone)]
pub struct PostgresNotificationStore {
    repository: NotificationRepository,
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: NotificationRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresNotificationStore {}

#[async_trait]
impl HealthCheckable for PostgresNotificationStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-notification-store").await
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    #[instrument(skip_all, fields(count = notifications.len()))]
    async fn create_batch(&self, notifications: &[Notification]) -> Result<usize, PortError> {
        let rows: Vec<NotificationRow> = notifications
            .iter()
            .map(|n| NotificationRow {
                id: *n.id.as_uuid(),
                user_id: n.user_id.value(),
                title: n.title.clone(),
                message: n.message.clone(),
                kind: kind_to_db(n.kind),
                link: n.link.clone(),
                is_read: n.is_read,
                created_at: n.created_at,
            })
            .collect();
        Ok(self.repository.insert_batch(&rows).await?)
    }

    async fn list_for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>, PortError> {
        let rows = self.repository.list_for_user(user_id.value(), unread_only).await?;
        Ok(rows
            .into_iter()
            .map(|row| Notification {
                id: NotificationId::from_uuid(row.id),
                user_id: UserId::new(row.user_id),
                title: row.title,
                message: row.message,
                kind: kind_from_db(row.kind),
                link: row.link,
                is_read: row.is_read,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), PortError> {
        self.repository.mark_read(user_id.value(), *id.as_uuid()).await?;
        Ok(())
    }
}

fn kind_to_db(kind: NotificationType) -> NotificationKind {
    match kind {
        NotificationType::Info => NotificationKind::Info,
        NotificationType::Success => NotificationKind::Success,
        NotificationType::Warning => NotificationKind::Warning,
        NotificationType::Error => NotificationKind::Error,
    }
}

fn kind_from_db(kind: NotificationKind) -> NotificationType {
    match kind {
        NotificationKind::Info => NotificationType::Info,
        NotificationKind::Success => NotificationType::Success,
        NotificationKind::Warning => NotificationType::Warning,
        NotificationKind::Error => NotificationType::Error,
    }
}

// ============================================================================
// User directory
// ============================================================================

/// Reads the identity provider's `users` table
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    repository: UserRepository,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UserRepository::new(pool),
        }
    }

    /// Adds a user; for seeders and tests
    pub async fn insert(&self, user: &DirectoryUser) -> Result<(), PortError> {
        let row = UserRow {
            id: user.id.value(),
            display_name: user.display_name.clone(),
            role: user.role.as_str().to_string(),
            active: user.active,
            dealer_id: user.dealer_id.map(|d| d.value()),
        };
        self.repository.insert(&row).await?;
        Ok(())
    }
}

impl DomainPort for PostgresUserDirectory {}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn active_users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, PortError> {
        let names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let rows = self.repository.active_with_roles(&names).await?;
        Ok(rows.into_iter().filter_map(row_to_user).collect())
    }

    async fn users_of_dealer(&self, dealer_id: DealerId) -> Result<Vec<DirectoryUser>, PortError> {
        let rows = self.repository.active_of_dealer(dealer_id.value()).await?;
        Ok(rows.into_iter().filter_map(row_to_user).collect())
    }
}

/// Users with a role the engine does not know are skipped
fn row_to_user(row: UserRow) -> Option<DirectoryUser> {
    let role = match row.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!(user_id = row.id, error = %e, "skipping user with unknown role");
            return None;
        }
    };
    Some(DirectoryUser {
        id: UserId::new(row.id),
        display_name: row.display_name,
        role,
        active: row.active,
        dealer_id: row.dealer_id.map(DealerId::new),
    })
}
