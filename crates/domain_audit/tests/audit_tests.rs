//! Integration tests for the audit domain

use std::sync::Arc;

use core_kernel::{Actor, DealerId, Role, UserId};
use domain_audit::*;

fn user(id: i64, name: &str, role: Role, dealer: Option<i64>) -> DirectoryUser {
    DirectoryUser {
        id: UserId::new(id),
        display_name: name.to_string(),
        role,
        active: true,
        dealer_id: dealer.map(DealerId::new),
    }
}

async fn office() -> InMemoryUserDirectory {
    InMemoryUserDirectory::with_users(vec![
        user(1, "Root", Role::Superadmin, None),
        user(2, "Office Admin", Role::Admin, None),
        user(3, "Back Office", Role::Staff, None),
        user(4, "Finance", Role::Accountant, None),
        user(10, "Acme Motors", Role::Dealer, Some(42)),
        user(11, "Acme Sales", Role::Dealer, Some(42)),
        user(20, "Customer", Role::Customer, None),
        DirectoryUser {
            active: false,
            ..user(5, "Former Admin", Role::Admin, None)
        },
    ])
    .await
}

fn wire(users: InMemoryUserDirectory) -> (AuditRecorder, InMemoryAuditStore, InMemoryNotificationStore) {
    let audit = InMemoryAuditStore::new();
    let notifications = InMemoryNotificationStore::new();
    let fanout = NotificationFanOut::new(Arc::new(users), Arc::new(notifications.clone()));
    (AuditRecorder::new(Arc::new(audit.clone()), fanout), audit, notifications)
}

mod fanout_tests {
    use super::*;

    #[tokio::test]
    async fn test_dealer_intake_masks_dealer_name() {
        let (recorder, _, notifications) = wire(office().await);
        let dealer = Actor::dealer(UserId::new(10), "Acme Motors", DealerId::new(42));

        recorder
            .record(
                AuditEntry::new(AuditAction::CreateCustomer, EntityRef::customer_file("CF-1", "Ali Veli"))
                    .by(&dealer),
            )
            .await;

        let all = notifications.all().await;
        assert_eq!(all.len(), 3);

        let to = |id: i64| all.iter().find(|n| n.user_id == UserId::new(id)).unwrap();
        assert!(to(1).message.contains("Acme Motors"));
        assert!(!to(2).message.contains("Acme Motors"));
        assert!(!to(3).message.contains("Acme Motors"));
        assert!(to(2).message.contains("#42"));
        assert!(to(3).message.contains("#42"));
    }

    #[tokio::test]
    async fn test_actor_and_inactive_users_excluded() {
        let (recorder, _, notifications) = wire(office().await);
        let admin = Actor::new(UserId::new(2), "Office Admin", Role::Admin);

        recorder
            .record(
                AuditEntry::new(AuditAction::CloseFile, EntityRef::customer_file("CF-1", "Ali Veli"))
                    .by(&admin),
            )
            .await;

        let recipients: Vec<UserId> = notifications.all().await.iter().map(|n| n.user_id).collect();
        assert_eq!(recipients, vec![UserId::new(1)]);
    }

    #[tokio::test]
    async fn test_status_change_reaches_dealer_users_and_customer() {
        let notifications = InMemoryNotificationStore::new();
        let staff = Actor::new(UserId::new(3), "Back Office", Role::Staff);

        let notified = NotificationFanOut::new(Arc::new(office().await), Arc::new(notifications.clone()))
            .fan_out(&AuditEvent::from_entry(
                AuditEntry::new(AuditAction::UpdateStatus, EntityRef::customer_file("CF-1", "Ali Veli"))
                    .by(&staff)
                    .with_after(serde_json::json!({ "status": "approved", "label": "Approved" }))
                    .with_audience(Audience {
                        dealer_id: Some(DealerId::new(42)),
                        customer_user_id: Some(UserId::new(20)),
                    }),
                chrono::Utc::now(),
            ))
            .await;

        // superadmin + admin, two dealer users, one customer
        assert_eq!(notified, 5);
        let customer = notifications.list_for_user(UserId::new(20), true).await.unwrap();
        assert_eq!(customer.len(), 1);
        assert!(customer[0].message.contains("Approved"));
    }

    #[tokio::test]
    async fn test_new_user_announced_to_superadmin_only() {
        let (recorder, audit, notifications) = wire(office().await);
        let admin = Actor::new(UserId::new(2), "Office Admin", Role::Admin);

        recorder
            .record(AuditEntry::user_created(&admin, UserId::new(30), "Ayse Yilmaz", Role::Accountant))
            .await;

        let stored = audit.events().await;
        assert_eq!(stored[0].action, AuditAction::CreateUser);
        assert_eq!(stored[0].entity.entity_id.as_deref(), Some("30"));

        let all = notifications.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, UserId::new(1));
        assert_eq!(all[0].title, "New user");
        assert!(all[0].message.contains("Ayse Yilmaz"));
    }

    #[tokio::test]
    async fn test_payment_goes_to_financial_roles() {
        let (recorder, _, notifications) = wire(office().await);
        let root = Actor::new(UserId::new(1), "Root", Role::Superadmin);

        recorder
            .record(
                AuditEntry::new(AuditAction::CreatePayment, EntityRef::customer_file("CF-1", "Ali Veli"))
                    .by(&root),
            )
            .await;

        let mut recipients: Vec<i64> = notifications
            .all()
            .await
            .iter()
            .map(|n| n.user_id.value())
            .collect();
        recipients.sort();
        assert_eq!(recipients, vec![2, 4]);
    }
}

mod notification_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_read_only_by_owner() {
        let (recorder, _, notifications) = wire(office().await);
        recorder
            .record(AuditEntry::dealer_created(
                &Actor::new(UserId::new(2), "Office Admin", Role::Admin),
                DealerId::new(42),
                "Acme Motors",
            ))
            .await;

        let root_inbox = notifications.list_for_user(UserId::new(1), true).await.unwrap();
        assert_eq!(root_inbox.len(), 1);
        let id = root_inbox[0].id;

        assert!(notifications.mark_read(UserId::new(2), id).await.is_err());
        notifications.mark_read(UserId::new(1), id).await.unwrap();
        assert!(notifications.list_for_user(UserId::new(1), true).await.unwrap().is_empty());
    }
}

mod dispatcher_tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_as_sink() {
        let (recorder, audit, _) = wire(office().await);
        let (dispatcher, worker) = AuditDispatcher::spawn(recorder, 8);

        {
            let sink: Arc<dyn AuditSink> = Arc::new(dispatcher.clone());
            sink.submit(AuditEntry::login_failed("eve")).await;
            sink.submit(AuditEntry::login(&Actor::new(UserId::new(2), "Office Admin", Role::Admin)))
                .await;
        }
        let stats_dropped = dispatcher.stats().dropped();
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(stats_dropped, 0);
        let events = audit.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].actor.role, Role::System);
    }
}
