//! In-memory engine harness
//!
//! Wires a [`LifecycleService`] to in-memory stores, the fixture office
//! directory and a real audit recorder, so scenario tests exercise the
//! complete path from mutation to notification.

use std::sync::Arc;

use tokio::task::JoinHandle;

use core_kernel::{Actor, CustomerFileId, UserId};
use domain_applicant::ApplicantCandidate;
use domain_audit::{
    AuditAction, AuditDispatcher, AuditEvent, AuditRecorder, AuditSink, InMemoryAuditStore,
    InMemoryNotificationStore, InMemoryUserDirectory, Notification, NotificationFanOut,
};
use domain_claims::{
    CustomerFile, DocumentChange, DocumentUpload, FileType, InMemoryClaimsStore, LifecycleService,
};

use crate::builders::FileIntakeBuilder;
use crate::fixtures::{FileTypeFixtures, UserFixtures, OFFICE_DIRECTORY};

/// A lifecycle service with every collaborator held in memory
pub struct EngineHarness {
    pub service: LifecycleService,
    pub store: InMemoryClaimsStore,
    pub audit: InMemoryAuditStore,
    pub notifications: InMemoryNotificationStore,
    pub file_type: FileType,
}

impl EngineHarness {
    /// Harness around the motor damage file type, auditing synchronously
    pub async fn new() -> Self {
        Self::with_file_type(FileTypeFixtures::motor_damage()).await
    }

    pub async fn with_file_type(file_type: FileType) -> Self {
        let parts = Parts::new(file_type).await;
        let recorder = parts.recorder().await;
        parts.into_harness(Arc::new(recorder))
    }

    /// Harness whose audit entries go through an [`AuditDispatcher`]
    ///
    /// Events and notifications only become visible after [`Self::drain`].
    pub async fn dispatched(capacity: usize) -> (Self, JoinHandle<()>) {
        let parts = Parts::new(FileTypeFixtures::motor_damage()).await;
        let recorder = parts.recorder().await;
        let (dispatcher, worker) = AuditDispatcher::spawn(recorder, capacity);
        (parts.into_harness(Arc::new(dispatcher)), worker)
    }

    /// Drops the service, waits for the dispatcher worker to empty the
    /// channel and hands back the audit and notification stores
    pub async fn drain(self, worker: JoinHandle<()>) -> (InMemoryAuditStore, InMemoryNotificationStore) {
        let Self { service, audit, notifications, .. } = self;
        drop(service);
        worker.await.expect("audit worker panicked");
        (audit, notifications)
    }

    /// Opens a file for `applicant`, linked to the fixture customer login
    pub async fn open_for(&self, actor: &Actor, applicant: ApplicantCandidate) -> CustomerFile {
        let intake = FileIntakeBuilder::new(self.file_type.id)
            .applicant(applicant)
            .for_customer_login()
            .build();
        self.service
            .create_file(actor, intake)
            .await
            .expect("intake should succeed")
    }

    /// Uploads a document as back-office staff
    pub async fn upload(&self, file_id: CustomerFileId, code: &str) -> DocumentChange {
        self.service
            .add_document(
                &UserFixtures::staff(),
                file_id,
                DocumentUpload::new(code, format!("blob://{file_id}/{code}")),
            )
            .await
            .expect("upload should succeed")
    }

    /// Uploads every required document of the harness file type
    pub async fn complete_documents(&self, file_id: CustomerFileId) -> CustomerFile {
        let mut latest = None;
        for code in self.file_type.required_codes() {
            latest = Some(self.upload(file_id, code).await.file);
        }
        match latest {
            Some(file) => file,
            None => self
                .service
                .get_file(&UserFixtures::admin(), file_id)
                .await
                .expect("file should exist"),
        }
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.audit.events().await
    }

    pub async fn actions(&self) -> Vec<AuditAction> {
        self.events().await.iter().map(|e| e.action).collect()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.notifications.all().await
    }

    pub async fn inbox_of(&self, user_id: UserId) -> Vec<Notification> {
        self.sent()
            .await
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

struct Parts {
    store: InMemoryClaimsStore,
    audit: InMemoryAuditStore,
    notifications: InMemoryNotificationStore,
    file_type: FileType,
}

impl Parts {
    async fn new(file_type: FileType) -> Self {
        Self {
            store: InMemoryClaimsStore::with_file_types(vec![file_type.clone()]).await,
            audit: InMemoryAuditStore::new(),
            notifications: InMemoryNotificationStore::new(),
            file_type,
        }
    }

    async fn recorder(&self) -> AuditRecorder {
        let users = InMemoryUserDirectory::with_users(OFFICE_DIRECTORY.clone()).await;
        AuditRecorder::new(
            Arc::new(self.audit.clone()),
            NotificationFanOut::new(Arc::new(users), Arc::new(self.notifications.clone())),
        )
    }

    fn into_harness(self, sink: Arc<dyn AuditSink>) -> EngineHarness {
        EngineHarness {
            service: LifecycleService::new(Arc::new(self.store.clone()), sink),
            store: self.store,
            audit: self.audit,
            notifications: self.notifications,
            file_type: self.file_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ApplicantFixtures;

    #[tokio::test]
    async fn test_harness_records_intake() {
        let harness = EngineHarness::new().await;
        harness.open_for(&UserFixtures::admin(), ApplicantFixtures::ali_veli()).await;

        assert_eq!(harness.store.file_count().await, 1);
        assert_eq!(harness.actions().await, vec![AuditAction::CreateCustomer]);
    }

    #[tokio::test]
    async fn test_dispatched_harness_drains() {
        let (harness, worker) = EngineHarness::dispatched(64).await;
        harness.open_for(&UserFixtures::admin(), ApplicantFixtures::ali_veli()).await;

        let (audit, _) = harness.drain(worker).await;
        assert_eq!(audit.events().await.len(), 1);
    }
}
