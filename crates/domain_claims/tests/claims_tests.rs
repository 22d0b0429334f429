//! Lifecycle tests for domain_claims

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{Actor, CustomerFileId, DealerId, Money, PortError, Role, UserId};
use domain_applicant::ApplicantCandidate;
use domain_audit::{
    AuditAction, AuditRecorder, DirectoryUser, InMemoryAuditStore, InMemoryNotificationStore,
    InMemoryUserDirectory, NotificationFanOut,
};
use domain_claims::*;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: LifecycleService,
    store: InMemoryClaimsStore,
    audit: InMemoryAuditStore,
    notifications: InMemoryNotificationStore,
    file_type: FileType,
}

fn directory_user(id: i64, name: &str, role: Role, dealer: Option<i64>) -> DirectoryUser {
    DirectoryUser {
        id: UserId::new(id),
        display_name: name.to_string(),
        role,
        active: true,
        dealer_id: dealer.map(DealerId::new),
    }
}

async fn harness_with(file_type: FileType) -> Harness {
    let store = InMemoryClaimsStore::with_file_types(vec![file_type.clone()]).await;
    let audit = InMemoryAuditStore::new();
    let notifications = InMemoryNotificationStore::new();
    let users = InMemoryUserDirectory::with_users(vec![
        directory_user(1, "Root", Role::Superadmin, None),
        directory_user(2, "Office Admin", Role::Admin, None),
        directory_user(3, "Back Office", Role::Staff, None),
        directory_user(4, "Finance", Role::Accountant, None),
        directory_user(10, "Acme Motors", Role::Dealer, Some(42)),
        directory_user(20, "Ali Veli", Role::Customer, None),
    ])
    .await;

    let recorder = AuditRecorder::new(
        Arc::new(audit.clone()),
        NotificationFanOut::new(Arc::new(users), Arc::new(notifications.clone())),
    );
    let service = LifecycleService::new(Arc::new(store.clone()), Arc::new(recorder));

    Harness {
        service,
        store,
        audit,
        notifications,
        file_type,
    }
}

async fn harness() -> Harness {
    harness_with(FileType::new(
        "Motor damage",
        vec![
            DocumentRequirement::required("A", "Driving licence"),
            DocumentRequirement::required("B", "Police report"),
            DocumentRequirement::optional("photo", "Damage photos"),
        ],
    ))
    .await
}

fn admin() -> Actor {
    Actor::new(UserId::new(2), "Office Admin", Role::Admin)
}

fn staff() -> Actor {
    Actor::new(UserId::new(3), "Back Office", Role::Staff)
}

fn applicant() -> ApplicantCandidate {
    ApplicantCandidate::new("Ali Veli", "10000000146", "0532 123 45 67", "34 ABC 123")
}

impl Harness {
    async fn open(&self, actor: &Actor) -> CustomerFile {
        let mut intake = FileIntake::new(self.file_type.id, applicant());
        intake.customer_user_id = Some(UserId::new(20));
        self.service.create_file(actor, intake).await.unwrap()
    }

    async fn upload(&self, file_id: CustomerFileId, code: &str) -> DocumentChange {
        self.service
            .add_document(&staff(), file_id, DocumentUpload::new(code, format!("blob://{code}")))
            .await
            .unwrap()
    }

    async fn actions(&self) -> Vec<AuditAction> {
        self.audit.events().await.iter().map(|e| e.action).collect()
    }
}

fn lira(amount: rust_decimal::Decimal) -> Option<Money> {
    Some(Money::lira(amount))
}

// ============================================================================
// Document-gated transitions
// ============================================================================

mod document_gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_lifecycle_to_locked() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        assert_eq!(file.status, FileStatus::DocumentStage);
        assert_eq!(file.document_status, DocumentStatus::Incomplete);

        let after_a = h.upload(file.id, "A").await;
        assert_eq!(after_a.file.status, FileStatus::DocumentStage);
        assert_eq!(after_a.completeness.missing, vec!["B"]);

        let after_b = h.upload(file.id, "B").await;
        assert_eq!(after_b.file.status, FileStatus::ApplicationStage);
        assert_eq!(after_b.file.document_status, DocumentStatus::Complete);

        let closed = h
            .service
            .close_file(
                &admin(),
                file.id,
                "Paid out by insurer",
                SettlementInput {
                    gross_payout: lira(dec!(500)),
                    dealer_commission: lira(dec!(75)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(closed.file.locked);
        assert_eq!(closed.file.status, FileStatus::Closed);
        assert_eq!(closed.closure.settlement.net_profit, lira(dec!(425)));

        let err = h
            .service
            .change_status(&admin(), file.id, FileStatus::OnHold)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyLocked { file_id } if file_id == file.id));

        // Notes remain writable
        h.service.append_note(&staff(), file.id, "Customer called to thank us").await.unwrap();

        assert_eq!(
            h.actions().await,
            vec![
                AuditAction::CreateCustomer,
                AuditAction::UploadDocument,
                AuditAction::UploadDocument,
                AuditAction::UpdateStatus,
                AuditAction::CloseFile,
                AuditAction::AddNote,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_keeps_file_waiting() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        let a = h.upload(file.id, "A").await;

        h.service
            .review_document(&staff(), a.document.id, ApprovalStatus::Rejected, Some("blurry".into()))
            .await
            .unwrap();

        let b = h.upload(file.id, "B").await;
        assert_eq!(b.file.status, FileStatus::DocumentStage);
        assert_eq!(b.completeness.missing, vec!["A"]);

        let again = h.upload(file.id, "A").await;
        assert_eq!(again.file.status, FileStatus::ApplicationStage);
    }

    #[tokio::test]
    async fn test_later_stage_only_refreshes_flag() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        h.upload(file.id, "A").await;
        let complete = h.upload(file.id, "B").await;

        h.service
            .change_status(&admin(), file.id, FileStatus::LitigationStage)
            .await
            .unwrap();

        let change = h
            .service
            .review_document(&staff(), complete.document.id, ApprovalStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(change.file.status, FileStatus::LitigationStage);
        assert_eq!(change.file.document_status, DocumentStatus::Incomplete);
    }

    #[tokio::test]
    async fn test_loose_matching_is_configurable() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        h.upload(file.id, "scan_A_front").await;
        let report = h.service.document_report(&staff(), file.id).await.unwrap();
        assert_eq!(report.missing, vec!["B"]);

        let exact = h.service.clone().with_match_mode(MatchMode::Exact);
        let report = exact.document_report(&staff(), file.id).await.unwrap();
        assert_eq!(report.missing, vec!["A", "B"]);
        assert!(report.requirements.iter().all(|r| !r.satisfied));
    }
}

// ============================================================================
// Lock invariant
// ============================================================================

mod lock_tests {
    use super::*;

    #[tokio::test]
    async fn test_locked_file_refuses_every_mutation() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        let doc = h.upload(file.id, "A").await.document;
        h.service
            .close_file(&admin(), file.id, "Withdrawn", SettlementInput::default())
            .await
            .unwrap();

        let locked = |r: Result<_, ClaimError>| matches!(r, Err(ClaimError::AlreadyLocked { .. }));

        assert!(locked(h.service.add_document(&staff(), file.id, DocumentUpload::new("B", "x")).await.map(|_| ())));
        assert!(locked(
            h.service
                .review_document(&staff(), doc.id, ApprovalStatus::Approved, None)
                .await
                .map(|_| ())
        ));
        assert!(locked(
            h.service
                .update_details(
                    &admin(),
                    file.id,
                    FileDetailsUpdate {
                        plate: Some("06 ZZ 1".into()),
                        ..Default::default()
                    }
                )
                .await
                .map(|_| ())
        ));
        assert!(locked(
            h.service
                .record_payment(&admin(), file.id, NewPayment::new(Money::lira(dec!(10)), PaymentKind::Incoming))
                .await
                .map(|_| ())
        ));
        assert!(locked(
            h.service
                .close_file(&admin(), file.id, "again", SettlementInput::default())
                .await
                .map(|_| ())
        ));
        assert!(locked(h.service.delete_file(&admin(), file.id).await));

        let stored = h.store.get_file(file.id).await.unwrap();
        assert!(stored.locked);
        assert_eq!(stored.status, FileStatus::Closed);
    }

    #[tokio::test]
    async fn test_store_refuses_writes_to_closed_file_at_current_version() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        let closed = h
            .service
            .close_file(&admin(), file.id, "Settled", SettlementInput::default())
            .await
            .unwrap();

        let err = h
            .store
            .update_file_atomic(
                file.id,
                closed.file.version,
                &FilePatch::document_status(DocumentStatus::Complete),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Locked { .. }), "{err:?}");
        assert!(matches!(ClaimError::from(err), ClaimError::AlreadyLocked { .. }));

        let stored = h.store.get_file(file.id).await.unwrap();
        assert_eq!(stored.version, closed.file.version);
        assert_eq!(stored.document_status, closed.file.document_status);
    }

    #[tokio::test]
    async fn test_close_racing_status_change_leaves_one_winner() {
        let h = harness().await;
        let file = h.open(&admin()).await;

        let (admin_actor, staff_actor) = (admin(), staff());
        let (close, change) = tokio::join!(
            h.service
                .close_file(&admin_actor, file.id, "Withdrawn", SettlementInput::default()),
            h.service.change_status(&staff_actor, file.id, FileStatus::OnHold),
        );

        assert!(close.is_ok() != change.is_ok(), "close: {close:?}, change: {change:?}");
        let loser = close.as_ref().err().or(change.as_ref().err()).unwrap();
        assert!(
            matches!(loser, ClaimError::AlreadyLocked { .. } | ClaimError::ConcurrentModification { .. }),
            "{loser:?}"
        );

        let stored = h.store.get_file(file.id).await.unwrap();
        assert_eq!(stored.locked, stored.status == FileStatus::Closed);
        assert_eq!(stored.locked, close.is_ok());
    }

    #[tokio::test]
    async fn test_stale_version_refused_by_store() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        h.service
            .change_status(&admin(), file.id, FileStatus::OnHold)
            .await
            .unwrap();

        let err = h
            .store
            .update_file_atomic(file.id, file.version, &FilePatch::document_status(DocumentStatus::Complete))
            .await
            .unwrap_err();
        assert!(matches!(ClaimError::from(err), ClaimError::ConcurrentModification { .. }));
    }

    #[tokio::test]
    async fn test_closure_requires_reason_and_capability() {
        let h = harness().await;
        let file = h.open(&admin()).await;

        let err = h
            .service
            .close_file(&admin(), file.id, "  ", SettlementInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::MissingRequiredField { ref field } if field == "closure_reason"));

        let err = h
            .service
            .close_file(&staff(), file.id, "done", SettlementInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Forbidden { .. }));

        assert!(!h.store.get_file(file.id).await.unwrap().locked);
    }
}

// ============================================================================
// Duplicates and details
// ============================================================================

mod duplicate_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_intake_of_same_person_rejected() {
        let h = harness().await;
        let first = h.open(&admin()).await;

        let reformatted = ApplicantCandidate::new("ALI  VELI", "100-000-001-46", "+905321234567", "34abc123");
        let err = h
            .service
            .create_file(&admin(), FileIntake::new(h.file_type.id, reformatted))
            .await
            .unwrap_err();

        match err {
            ClaimError::DuplicateApplicant { existing, fields, message } => {
                assert_eq!(existing, Some(first.id));
                assert_eq!(fields[0], "national ID");
                assert!(message.contains("Ali Veli"));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(h.store.file_count().await, 1);
    }

    #[tokio::test]
    async fn test_edit_does_not_collide_with_itself() {
        let h = harness().await;
        let file = h.open(&admin()).await;

        let updated = h
            .service
            .update_details(
                &admin(),
                file.id,
                FileDetailsUpdate {
                    phone: Some("0555 444 33 22".into()),
                    insurance_company: Some("Anadolu Sigorta".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.details.phone, "05554443322");
        assert_eq!(updated.version, file.version + 1);
    }

    #[tokio::test]
    async fn test_edit_onto_another_applicant_rejected() {
        let h = harness().await;
        let first = h.open(&admin()).await;
        let second = h
            .service
            .create_file(
                &admin(),
                FileIntake::new(
                    h.file_type.id,
                    ApplicantCandidate::new("Zeynep Kaya", "12345678950", "05449998877", "06 ZK 99"),
                ),
            )
            .await
            .unwrap();

        let err = h
            .service
            .update_details(
                &admin(),
                second.id,
                FileDetailsUpdate {
                    national_id: Some(first.details.national_id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::DuplicateApplicant { existing: Some(id), .. } if id == first.id));
    }

    #[tokio::test]
    async fn test_invalid_phone_is_a_normalization_error() {
        let h = harness().await;
        let mut candidate = applicant();
        candidate.phone = "12345".into();

        let err = h
            .service
            .create_file(&admin(), FileIntake::new(h.file_type.id, candidate))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Normalization(_)));
        assert!(err.to_string().contains("12345"));
    }
}

// ============================================================================
// Payments, deletion, notifications
// ============================================================================

mod side_effect_tests {
    use super::*;
    use domain_audit::NotificationStore;

    #[tokio::test]
    async fn test_payment_recorded_and_announced_to_finance() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        let accountant = Actor::new(UserId::new(4), "Finance", Role::Accountant);

        let payment = h
            .service
            .record_payment(
                &accountant,
                file.id,
                NewPayment::new(Money::lira(dec!(1250)), PaymentKind::Incoming).with_description("Insurer transfer"),
            )
            .await
            .unwrap();
        assert_eq!(h.service.list_payments(&accountant, file.id).await.unwrap(), vec![payment]);

        let finance_inbox = h.notifications.list_for_user(UserId::new(1), false).await.unwrap();
        assert!(finance_inbox.iter().any(|n| n.title == "Payment recorded"));
    }

    #[tokio::test]
    async fn test_zero_payment_rejected() {
        let h = harness().await;
        let file = h.open(&admin()).await;
        let err = h
            .service
            .record_payment(&admin(), file.id, NewPayment::new(Money::lira(dec!(0)), PaymentKind::Outgoing))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_status_change_notifies_customer() {
        let h = harness().await;
        let file = h.open(&admin()).await;

        h.service
            .change_status(&staff(), file.id, FileStatus::Approved)
            .await
            .unwrap();

        let inbox = h.notifications.list_for_user(UserId::new(20), false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("Approved"));
    }

    #[tokio::test]
    async fn test_delete_open_file() {
        let h = harness().await;
        let file = h.open(&admin()).await;

        h.service.delete_file(&admin(), file.id).await.unwrap();
        assert!(matches!(
            h.service.get_file(&admin(), file.id).await,
            Err(ClaimError::NotFound { .. })
        ));
        assert_eq!(h.actions().await.last(), Some(&AuditAction::DeleteCustomer));
    }

    #[tokio::test]
    async fn test_login_events() {
        let h = harness().await;
        h.service.record_login(&admin()).await;
        h.service.record_login_failed("mallory").await;

        assert_eq!(h.actions().await, vec![AuditAction::Login, AuditAction::LoginFailed]);
        let root_inbox = h.notifications.list_for_user(UserId::new(1), false).await.unwrap();
        assert_eq!(root_inbox.len(), 1);
    }
}
