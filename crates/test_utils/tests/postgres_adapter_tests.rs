//! PostgreSQL adapter tests
//!
//! Every test here starts its own container and is ignored by default.
//! Run with `cargo test -p test_utils --test postgres_adapter_tests -- --ignored`.

use std::sync::Arc;

use core_kernel::{AdapterHealth, HealthCheckable, PortError};
use domain_applicant::{ApplicantLookup, LooseQuery, NormalizedIdentity};
use domain_audit::{
    AuditAction, AuditRecorder, AuditStore, NotificationFanOut, NotificationStore,
};
use domain_claims::{
    ApprovalStatus, ClaimsStore, DocumentStatus, FilePatch, FileStatus, LifecycleService,
};
use infra_db::{
    PostgresAuditStore, PostgresClaimsStore, PostgresNotificationStore, PostgresUserDirectory,
};
use test_utils::*;

db_test!(stored_file_reads_back_with_canonical_identity, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    let file = CustomerFileBuilder::new(file_type.id)
        .applicant(ApplicantFixtures::ali_veli_reformatted())
        .dealer(UserFixtures::ACME)
        .build();

    store.create_file(&file).await.unwrap();
    let back = store.get_file(file.id).await.unwrap();

    assert_eq!(back.details, file.details);
    assert_eq!(back.dealer_id, Some(UserFixtures::ACME));
    assert_eq!(back.status, FileStatus::DocumentStage);
    assert_eq!(back.version, 1);
    assert_eq!(store.health_check().await.status, AdapterHealth::Healthy);
});

db_test!(second_file_for_the_same_national_id_is_rejected, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    store
        .create_file(&CustomerFileBuilder::new(file_type.id).build())
        .await
        .unwrap();

    let again = CustomerFileBuilder::new(file_type.id)
        .applicant(ApplicantFixtures::ali_veli_reformatted())
        .build();
    let result = store.create_file(&again).await;

    assert!(
        matches!(result, Err(PortError::Duplicate { ref field, .. }) if field == "national_id"),
        "{:?}",
        result
    );
});

db_test!(compare_and_set_refuses_stale_versions_and_locked_files, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    let open = CustomerFileBuilder::new(file_type.id).build();
    store.create_file(&open).await.unwrap();

    let patch = FilePatch::document_status(DocumentStatus::Complete);
    let updated = store.update_file_atomic(open.id, 1, &patch).await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.document_status, DocumentStatus::Complete);

    let stale = store.update_file_atomic(open.id, 1, &patch).await;
    assert!(matches!(stale, Err(PortError::StaleVersion { expected: 1, .. })), "{:?}", stale);

    let closed = CustomerFileBuilder::new(file_type.id)
        .applicant(ApplicantFixtures::zeynep_kaya())
        .closed("Settled", Some(MoneyFixtures::lira(rust_decimal_macros::dec!(700))))
        .build();
    store.create_file(&closed).await.unwrap();

    let locked = store.update_file_atomic(closed.id, closed.version, &patch).await;
    assert!(matches!(locked, Err(PortError::Locked { .. })), "{:?}", locked);

    let reread = store.get_file(closed.id).await.unwrap();
    assert_closed_and_locked(&reread);
    assert_lira(reread.closure.unwrap().settlement.net_profit, rust_decimal_macros::dec!(700));
});

db_test!(documents_cannot_be_attached_to_locked_files, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    let closed = CustomerFileBuilder::new(file_type.id).closed("Withdrawn", None).build();
    store.create_file(&closed).await.unwrap();

    let result = store
        .create_document(&DocumentBuilder::new(closed.id, "A").build())
        .await;
    assert!(matches!(result, Err(PortError::Locked { .. })), "{:?}", result);
});

db_test!(document_review_is_persisted, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    let file = CustomerFileBuilder::new(file_type.id).build();
    store.create_file(&file).await.unwrap();

    let document = DocumentBuilder::new(file.id, "A").build();
    store.create_document(&document).await.unwrap();

    let reviewed = store
        .update_document_status(document.id, ApprovalStatus::Rejected, Some("blurry"))
        .await
        .unwrap();
    assert_eq!(reviewed.approval, ApprovalStatus::Rejected);
    assert_eq!(reviewed.review_note.as_deref(), Some("blurry"));

    let listed = store.list_documents(file.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].approval, ApprovalStatus::Rejected);
});

db_test!(loose_lookup_matches_any_identity_field, |db, file_type| {
    let store = PostgresClaimsStore::new(db.pool().clone());
    let file = CustomerFileBuilder::new(file_type.id).build();
    store.create_file(&file).await.unwrap();
    store
        .create_file(
            &CustomerFileBuilder::new(file_type.id)
                .applicant(ApplicantFixtures::mehmet_demir())
                .build(),
        )
        .await
        .unwrap();

    let identity = NormalizedIdentity::from_candidate(&ApplicantFixtures::ali_veli_reformatted(), false).unwrap();
    let by_identity = store.find_loose(&LooseQuery::from_identity(&identity)).await.unwrap();
    assert_eq!(by_identity.len(), 1);
    assert_eq!(by_identity[0].file_id, file.id);

    let by_prefix = store.find_by_phone_prefix("053").await.unwrap();
    assert!(by_prefix.iter().any(|a| a.file_id == file.id));
    assert!(by_prefix.iter().all(|a| a.phone.starts_with("053")));
});

db_test!(lifecycle_runs_against_postgres, |db, file_type| {
    let pool = db.pool().clone();
    let audit = PostgresAuditStore::new(pool.clone());
    let notifications = PostgresNotificationStore::new(pool.clone());
    let recorder = AuditRecorder::new(
        Arc::new(audit.clone()),
        NotificationFanOut::new(
            Arc::new(PostgresUserDirectory::new(pool.clone())),
            Arc::new(notifications.clone()),
        ),
    );
    let service = LifecycleService::new(Arc::new(PostgresClaimsStore::new(pool)), Arc::new(recorder));

    let intake = FileIntakeBuilder::new(file_type.id).for_customer_login().build();
    let file = service.create_file(&UserFixtures::acme_motors(), intake).await.unwrap();
    for code in ["A", "B"] {
        service
            .add_document(
                &UserFixtures::staff(),
                file.id,
                domain_claims::DocumentUpload::new(code, format!("blob://{code}")),
            )
            .await
            .unwrap();
    }

    let file = service.get_file(&UserFixtures::admin(), file.id).await.unwrap();
    assert_advanced_by_documents(&file);

    let history = audit
        .list_for_entity("customer", &file.id.to_string())
        .await
        .unwrap();
    assert_actions_in_order(
        &history,
        &[AuditAction::CreateCustomer, AuditAction::UploadDocument, AuditAction::UpdateStatus],
    );

    let superadmin_inbox = notifications.list_for_user(UserFixtures::ROOT, true).await.unwrap();
    assert_notified(&superadmin_inbox, UserFixtures::ROOT, "Acme Motors (#42)");

    let dealer_inbox = notifications.list_for_user(UserFixtures::ACME_USER, false).await.unwrap();
    assert_notified(&dealer_inbox, UserFixtures::ACME_USER, "moved to Application stage");
});
