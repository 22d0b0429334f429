//! Audit Domain Ports
//!
//! - [`AuditStore`]: append-only audit trail with a retention purge
//! - [`NotificationStore`]: per-user notification rows
//! - [`UserDirectory`]: read access to the identity collaborator's users

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DealerId, DomainPort, HealthCheckable, NotificationId, PortError, Role, UserId};

use crate::event::AuditEvent;
use crate::notification::Notification;

/// A user as known to the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub dealer_id: Option<DealerId>,
}

/// Append-only audit trail
#[async_trait]
pub trait AuditStore: DomainPort + HealthCheckable {
    /// Stores one event
    async fn insert(&self, event: &AuditEvent) -> Result<(), PortError>;

    /// Events about one entity, oldest first
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, PortError>;

    /// Most recent events first
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditEvent>, PortError>;

    /// Deletes every event older than `cutoff` and returns how many went
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError>;
}

/// Notification rows
#[async_trait]
pub trait NotificationStore: DomainPort + HealthCheckable {
    /// Stores a batch of notifications and returns how many were written
    async fn create_batch(&self, notifications: &[Notification]) -> Result<usize, PortError>;

    /// Notifications of one user, newest first
    async fn list_for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>, PortError>;

    /// Marks a notification read; only its owner may do so
    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), PortError>;
}

/// User lookups needed to resolve notification recipients
#[async_trait]
pub trait UserDirectory: DomainPort {
    /// Active users holding any of the roles
    async fn active_users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, PortError>;

    /// Active users belonging to a dealer organisation
    async fn users_of_dealer(&self, dealer_id: DealerId) -> Result<Vec<DirectoryUser>, PortError>;
}

/// In-memory adapters for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory [`AuditStore`]
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryAuditStore {
        events: Arc<RwLock<Vec<AuditEvent>>>,
    }

    impl InMemoryAuditStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything recorded so far, in insertion order
        pub async fn events(&self) -> Vec<AuditEvent> {
            self.events.read().await.clone()
        }
    }

    impl DomainPort for InMemoryAuditStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryAuditStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-audit-store")
        }
    }

    #[async_trait]
    impl AuditStore for InMemoryAuditStore {
        async fn insert(&self, event: &AuditEvent) -> Result<(), PortError> {
            self.events.write().await.push(event.clone());
            Ok(())
        }

        async fn list_for_entity(
            &self,
            entity_type: &str,
            entity_id: &str,
        ) -> Result<Vec<AuditEvent>, PortError> {
            Ok(self
                .events
                .read()
                .await
                .iter()
                .filter(|e| {
                    e.entity.entity_type == entity_type
                        && e.entity.entity_id.as_deref() == Some(entity_id)
                })
                .cloned()
                .collect())
        }

        async fn list_recent(&self, limit: usize) -> Result<Vec<AuditEvent>, PortError> {
            Ok(self.events.read().await.iter().rev().take(limit).cloned().collect())
        }

        async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError> {
            let mut events = self.events.write().await;
            let before = events.len();
            events.retain(|e| e.occurred_at >= cutoff);
            Ok((before - events.len()) as u64)
        }
    }

    /// In-memory [`NotificationStore`] that can be told to fail
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryNotificationStore {
        notifications: Arc<RwLock<Vec<Notification>>>,
        failing: Arc<AtomicBool>,
    }

    impl InMemoryNotificationStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent write fail with a connection error
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub async fn all(&self) -> Vec<Notification> {
            self.notifications.read().await.clone()
        }
    }

    impl DomainPort for InMemoryNotificationStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryNotificationStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-notification-store")
        }
    }

    #[async_trait]
    impl NotificationStore for InMemoryNotificationStore {
        async fn create_batch(&self, notifications: &[Notification]) -> Result<usize, PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("notification store unavailable"));
            }
            self.notifications.write().await.extend_from_slice(notifications);
            Ok(notifications.len())
        }

        async fn list_for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<Notification>, PortError> {
            Ok(self
                .notifications
                .read()
                .await
                .iter()
                .rev()
                .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
                .cloned()
                .collect())
        }

        async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), PortError> {
            let mut notifications = self.notifications.write().await;
            let notification = notifications
                .iter_mut()
                .find(|n| n.id == id && n.user_id == user_id)
                .ok_or_else(|| PortError::not_found("Notification", id))?;
            notification.is_read = true;
            Ok(())
        }
    }

    /// In-memory [`UserDirectory`]
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryUserDirectory {
        users: Arc<RwLock<Vec<DirectoryUser>>>,
    }

    impl InMemoryUserDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_users(users: Vec<DirectoryUser>) -> Self {
            let directory = Self::new();
            directory.users.write().await.extend(users);
            directory
        }

        pub async fn insert(&self, user: DirectoryUser) {
            self.users.write().await.push(user);
        }
    }

    impl DomainPort for InMemoryUserDirectory {}

    #[async_trait]
    impl UserDirectory for InMemoryUserDirectory {
        async fn active_users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, PortError> {
            Ok(self
                .users
                .read()
                .await
                .iter()
                .filter(|u| u.active && roles.contains(&u.role))
                .cloned()
                .collect())
        }

        async fn users_of_dealer(&self, dealer_id: DealerId) -> Result<Vec<DirectoryUser>, PortError> {
            Ok(self
                .users
                .read()
                .await
                .iter()
                .filter(|u| u.active && u.dealer_id == Some(dealer_id))
                .cloned()
                .collect())
        }
    }
}
