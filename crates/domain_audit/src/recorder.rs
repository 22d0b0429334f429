//! Audit recorder

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, instrument};

use core_kernel::{Actor, Capability};

use crate::error::AuditError;
use crate::event::{AuditAction, AuditEntry, AuditEvent, EntityRef};
use crate::fanout::NotificationFanOut;
use crate::ports::AuditStore;

/// Persists audit events and fans them out
///
/// Recording never fails towards the caller. A store failure is logged and
/// the fan-out still runs, since the notification rows live elsewhere.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    fanout: NotificationFanOut,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, fanout: NotificationFanOut) -> Self {
        Self { store, fanout }
    }

    /// Records an entry and returns the stamped event
    #[instrument(skip(self, entry), fields(action = %entry.action, entity = %entry.entity.entity_type))]
    pub async fn record(&self, entry: AuditEntry) -> AuditEvent {
        let event = AuditEvent::from_entry(entry, Utc::now());

        if let Err(e) = self.store.insert(&event).await {
            error!(event_id = %event.id, error = %e, "failed to persist audit event");
        }

        let notified = self.fanout.fan_out(&event).await;
        info!(event_id = %event.id, actor = %event.actor.id, notified, "audit event recorded");

        event
    }

    /// Audit trail of one entity, oldest first
    pub async fn history(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(self.store.list_for_entity(entity_type, entity_id).await?)
    }

    /// Deletes events older than `cutoff`; needs [`Capability::PurgeAudit`]
    ///
    /// The purge itself is recorded afterwards, so the trail always shows
    /// who removed history and up to when.
    pub async fn purge_before(&self, actor: &Actor, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        if !actor.can(Capability::PurgeAudit) {
            return Err(AuditError::forbidden(actor.role, "purge the audit log"));
        }

        let deleted = self.store.purge_before(cutoff).await?;
        info!(deleted, %cutoff, "audit log purged");

        self.record(
            AuditEntry::new(AuditAction::PurgeAudit, EntityRef::new("audit_log", None, None))
                .by(actor)
                .with_after(json!({ "cutoff": cutoff, "deleted": deleted })),
        )
        .await;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{InMemoryAuditStore, InMemoryNotificationStore, InMemoryUserDirectory};
    use crate::ports::DirectoryUser;
    use core_kernel::{capabilities_for, Role, UserId};

    async fn recorder() -> (AuditRecorder, InMemoryAuditStore, InMemoryNotificationStore) {
        let audit = InMemoryAuditStore::new();
        let notes = InMemoryNotificationStore::new();
        let users = InMemoryUserDirectory::with_users(vec![DirectoryUser {
            id: UserId::new(1),
            display_name: "Root".to_string(),
            role: Role::Superadmin,
            active: true,
            dealer_id: None,
        }])
        .await;
        let fanout = NotificationFanOut::new(Arc::new(users), Arc::new(notes.clone()));
        (AuditRecorder::new(Arc::new(audit.clone()), fanout), audit, notes)
    }

    #[tokio::test]
    async fn test_record_survives_notification_failure() {
        let (recorder, audit, notes) = recorder().await;
        notes.set_failing(true);

        let admin = Actor::new(UserId::new(9), "Office", Role::Admin);
        recorder
            .record(AuditEntry::dealer_created(&admin, core_kernel::DealerId::new(4), "Acme Motors"))
            .await;

        assert_eq!(audit.events().await.len(), 1);
        assert!(notes.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_requires_superadmin() {
        let (recorder, _, _) = recorder().await;
        let admin = Actor::new(UserId::new(9), "Office", Role::Admin);

        let err = recorder.purge_before(&admin, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AuditError::Forbidden { role: Role::Admin, .. }));
    }

    #[tokio::test]
    async fn test_purge_follows_capability_table() {
        let roles = [
            Role::Superadmin,
            Role::Admin,
            Role::Staff,
            Role::Accountant,
            Role::Dealer,
            Role::Customer,
            Role::System,
        ];
        for role in roles {
            let (recorder, audit, _) = recorder().await;
            let actor = Actor::new(UserId::new(7), "Anyone", role);

            let result = recorder.purge_before(&actor, Utc::now()).await;
            let granted = capabilities_for(role).contains(&Capability::PurgeAudit);
            assert_eq!(result.is_ok(), granted, "{role}");
            if !granted {
                assert!(audit.events().await.is_empty(), "{role} left a trail");
            }
        }
    }

    #[tokio::test]
    async fn test_purge_is_itself_audited() {
        let (recorder, audit, _) = recorder().await;
        let root = Actor::new(UserId::new(1), "Root", Role::Superadmin);
        recorder.record(AuditEntry::login_failed("eve")).await;

        let deleted = recorder
            .purge_before(&root, Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        let remaining = audit.events().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].action, AuditAction::PurgeAudit);
    }
}
