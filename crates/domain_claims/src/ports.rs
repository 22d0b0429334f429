//! Claims Store Port
//!
//! Everything the lifecycle service reads or writes goes through
//! [`ClaimsStore`]. Two guarantees matter beyond plain persistence:
//!
//! - `create_file` enforces uniqueness of the canonical national ID and
//!   reports a clash as [`PortError::Duplicate`], closing the race between
//!   two concurrent intakes of the same person;
//! - `update_file_atomic` is a compare-and-set on `version` that also
//!   refuses locked rows, so closure cannot interleave with another write.
//!
//! Document, payment and deletion writes refuse locked files as well; note
//! appends do not.

use async_trait::async_trait;

use core_kernel::{CustomerFileId, DocumentId, DomainPort, FileTypeId, HealthCheckable, PortError};
use domain_applicant::ApplicantLookup;

use crate::customer_file::{CustomerFile, FilePatch};
use crate::document::{ApprovalStatus, Document};
use crate::file_type::FileType;
use crate::note::Note;
use crate::payment::Payment;

/// Persistence of customer files and everything attached to them
#[async_trait]
pub trait ClaimsStore: ApplicantLookup + DomainPort + HealthCheckable {
    async fn get_file(&self, id: CustomerFileId) -> Result<CustomerFile, PortError>;

    async fn get_file_type(&self, id: FileTypeId) -> Result<FileType, PortError>;

    /// Inserts a new file; `Duplicate` if the canonical national ID is taken
    async fn create_file(&self, file: &CustomerFile) -> Result<(), PortError>;

    /// Applies `patch` if the stored version equals `expected_version` and
    /// the file is not locked; returns the updated file
    async fn update_file_atomic(
        &self,
        id: CustomerFileId,
        expected_version: i64,
        patch: &FilePatch,
    ) -> Result<CustomerFile, PortError>;

    /// Removes an unlocked file and everything attached to it
    async fn delete_file(&self, id: CustomerFileId) -> Result<(), PortError>;

    async fn get_document(&self, id: DocumentId) -> Result<Document, PortError>;

    async fn list_documents(&self, file_id: CustomerFileId) -> Result<Vec<Document>, PortError>;

    async fn create_document(&self, document: &Document) -> Result<(), PortError>;

    async fn update_document_status(
        &self,
        id: DocumentId,
        approval: ApprovalStatus,
        review_note: Option<&str>,
    ) -> Result<Document, PortError>;

    async fn create_payment(&self, payment: &Payment) -> Result<(), PortError>;

    async fn list_payments(&self, file_id: CustomerFileId) -> Result<Vec<Payment>, PortError>;

    async fn append_note(&self, note: &Note) -> Result<(), PortError>;

    async fn list_notes(&self, file_id: CustomerFileId) -> Result<Vec<Note>, PortError>;
}

/// In-memory store for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use chrono::Utc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;
    use domain_applicant::ports::phone_prefix_admits;
    use domain_applicant::{LooseQuery, StoredApplicant};

    const FILE: &str = "CustomerFile";

    #[derive(Debug, Default)]
    struct State {
        files: HashMap<CustomerFileId, CustomerFile>,
        file_types: HashMap<FileTypeId, FileType>,
        documents: Vec<Document>,
        payments: Vec<Payment>,
        notes: Vec<Note>,
    }

    impl State {
        fn file(&self, id: CustomerFileId) -> Result<&CustomerFile, PortError> {
            self.files.get(&id).ok_or_else(|| PortError::not_found(FILE, id))
        }

        fn unlocked_file(&self, id: CustomerFileId) -> Result<&CustomerFile, PortError> {
            let file = self.file(id)?;
            if file.locked {
                return Err(PortError::locked(FILE, id));
            }
            Ok(file)
        }
    }

    /// In-memory implementation of [`ClaimsStore`]
    ///
    /// All writes happen under a single lock, which gives the same
    /// atomicity the SQL adapter gets from single-statement updates.
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryClaimsStore {
        state: Arc<RwLock<State>>,
    }

    impl InMemoryClaimsStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with file types
        pub async fn with_file_types(file_types: Vec<FileType>) -> Self {
            let store = Self::new();
            for file_type in file_types {
                store.insert_file_type(file_type).await;
            }
            store
        }

        pub async fn insert_file_type(&self, file_type: FileType) {
            self.state.write().await.file_types.insert(file_type.id, file_type);
        }

        /// Number of stored files
        pub async fn file_count(&self) -> usize {
            self.state.read().await.files.len()
        }

        fn stored_applicants(state: &State) -> impl Iterator<Item = StoredApplicant> + '_ {
            state.files.values().map(CustomerFile::applicant)
        }
    }

    impl DomainPort for InMemoryClaimsStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryClaimsStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-claims-store")
        }
    }

    #[async_trait]
    impl ApplicantLookup for InMemoryClaimsStore {
        async fn find_loose(&self, query: &LooseQuery) -> Result<Vec<StoredApplicant>, PortError> {
            let state = self.state.read().await;
            Ok(Self::stored_applicants(&state).filter(|a| query.admits(a)).collect())
        }

        async fn find_by_phone_prefix(&self, prefix: &str) -> Result<Vec<StoredApplicant>, PortError> {
            let state = self.state.read().await;
            Ok(Self::stored_applicants(&state)
                .filter(|a| phone_prefix_admits(prefix, a))
                .collect())
        }
    }

    #[async_trait]
    impl ClaimsStore for InMemoryClaimsStore {
        async fn get_file(&self, id: CustomerFileId) -> Result<CustomerFile, PortError> {
            self.state.read().await.file(id).cloned()
        }

        async fn get_file_type(&self, id: FileTypeId) -> Result<FileType, PortError> {
            self.state
                .read()
                .await
                .file_types
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("FileType", id))
        }

        async fn create_file(&self, file: &CustomerFile) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state
                .files
                .values()
                .any(|f| f.details.national_id == file.details.national_id)
            {
                return Err(PortError::duplicate("national_id", &file.details.national_id));
            }
            state.files.insert(file.id, file.clone());
            Ok(())
        }

        async fn update_file_atomic(
            &self,
            id: CustomerFileId,
            expected_version: i64,
            patch: &FilePatch,
        ) -> Result<CustomerFile, PortError> {
            let mut state = self.state.write().await;
            if let Some(details) = patch.new_details() {
                if state
                    .files
                    .values()
                    .any(|f| f.id != id && f.details.national_id == details.national_id)
                {
                    return Err(PortError::duplicate("national_id", &details.national_id));
                }
            }

            let file = state
                .files
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found(FILE, id))?;

            if file.locked {
                return Err(PortError::locked(FILE, id));
            }
            if file.version != expected_version {
                return Err(PortError::stale(FILE, id, expected_version));
            }

            patch.apply_to(file, Utc::now());
            Ok(file.clone())
        }

        async fn delete_file(&self, id: CustomerFileId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.unlocked_file(id)?;
            state.files.remove(&id);
            state.documents.retain(|d| d.file_id != id);
            state.payments.retain(|p| p.file_id != id);
            state.notes.retain(|n| n.file_id != id);
            Ok(())
        }

        async fn get_document(&self, id: DocumentId) -> Result<Document, PortError> {
            self.state
                .read()
                .await
                .documents
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Document", id))
        }

        async fn list_documents(&self, file_id: CustomerFileId) -> Result<Vec<Document>, PortError> {
            let state = self.state.read().await;
            state.file(file_id)?;
            Ok(state.documents.iter().filter(|d| d.file_id == file_id).cloned().collect())
        }

        async fn create_document(&self, document: &Document) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.unlocked_file(document.file_id)?;
            state.documents.push(document.clone());
            Ok(())
        }

        async fn update_document_status(
            &self,
            id: DocumentId,
            approval: ApprovalStatus,
            review_note: Option<&str>,
        ) -> Result<Document, PortError> {
            let mut state = self.state.write().await;
            let file_id = state
                .documents
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.file_id)
                .ok_or_else(|| PortError::not_found("Document", id))?;
            state.unlocked_file(file_id)?;

            let document = state
                .documents
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| PortError::not_found("Document", id))?;
            document.approval = approval;
            document.review_note = review_note.map(str::to_string);
            Ok(document.clone())
        }

        async fn create_payment(&self, payment: &Payment) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.unlocked_file(payment.file_id)?;
            state.payments.push(payment.clone());
            Ok(())
        }

        async fn list_payments(&self, file_id: CustomerFileId) -> Result<Vec<Payment>, PortError> {
            let state = self.state.read().await;
            state.file(file_id)?;
            Ok(state.payments.iter().filter(|p| p.file_id == file_id).cloned().collect())
        }

        async fn append_note(&self, note: &Note) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.file(note.file_id)?;
            state.notes.push(note.clone());
            Ok(())
        }

        async fn list_notes(&self, file_id: CustomerFileId) -> Result<Vec<Note>, PortError> {
            let state = self.state.read().await;
            state.file(file_id)?;
            Ok(state.notes.iter().filter(|n| n.file_id == file_id).cloned().collect())
        }
    }
}
