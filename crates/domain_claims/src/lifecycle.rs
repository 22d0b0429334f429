//! Lifecycle service
//!
//! Every change to a customer file goes through [`LifecycleService`]. Each
//! operation follows the same order: load, authorize, check the lock,
//! validate, write through the store, then publish an audit entry. Nothing
//! is written before authorization and validation have passed, and audit
//! publishing happens after the write so it can never undo it.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    Actor, Capability, CustomerFileId, DocumentId, PortError, Role,
};
use domain_applicant::{ApplicantCandidate, ApplicantValidator, DuplicateDetector, NormalizedIdentity};
use domain_audit::{AuditAction, AuditEntry, AuditSink};

use crate::completeness::{evaluate, is_satisfied, Completeness, MatchMode};
use crate::config::EngineConfig;
use crate::customer_file::{
    CustomerFile, DocumentStatus, FileDetails, FileDetailsUpdate, FileIntake, FilePatch, FileStatus,
};
use crate::document::{ApprovalStatus, Document, DocumentUpload};
use crate::error::ClaimError;
use crate::note::Note;
use crate::payment::{NewPayment, Payment};
use crate::ports::ClaimsStore;

/// Re-evaluations attempted when the file moves under a completeness refresh
const REFRESH_ATTEMPTS: usize = 3;

/// Result of a document upload or review
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub document: Document,
    /// The file after completeness was refreshed
    pub file: CustomerFile,
    pub completeness: Completeness,
}

/// One requirement of the file type and whether it is met
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementState {
    pub code: String,
    pub label: String,
    pub required: bool,
    pub satisfied: bool,
}

/// Live document overview of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub file_id: CustomerFileId,
    pub status: FileStatus,
    /// As persisted on the file
    pub document_status: DocumentStatus,
    /// As evaluated now
    pub complete: bool,
    pub missing: Vec<String>,
    pub requirements: Vec<RequirementState>,
    pub documents: Vec<Document>,
}

/// Collapses whitespace runs in a display name
fn display_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The claim file lifecycle engine
#[derive(Clone)]
pub struct LifecycleService {
    pub(crate) store: Arc<dyn ClaimsStore>,
    pub(crate) audit: Arc<dyn AuditSink>,
    detector: DuplicateDetector,
    match_mode: MatchMode,
    strict_national_id: bool,
}

impl LifecycleService {
    /// Creates a service with default settings
    pub fn new(store: Arc<dyn ClaimsStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            detector: DuplicateDetector::new(),
            match_mode: MatchMode::default(),
            strict_national_id: false,
        }
    }

    /// Applies matching and validation settings from configuration
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_match_mode(config.document_match_mode)
            .with_strict_national_id(config.strict_national_id)
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_strict_national_id(mut self, strict: bool) -> Self {
        self.strict_national_id = strict;
        self.detector = DuplicateDetector::new().with_strict_national_id(strict);
        self
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    /// Checks the capability and, for dealers and customers, ownership of the file
    pub(crate) fn authorize(
        &self,
        actor: &Actor,
        capability: Capability,
        file: Option<&CustomerFile>,
    ) -> Result<(), ClaimError> {
        if !actor.can(capability) {
            warn!(actor = %actor.id, role = %actor.role, %capability, "capability denied");
            return Err(ClaimError::forbidden(capability, actor.role));
        }

        if let Some(file) = file {
            let in_scope = match actor.role {
                Role::Dealer => actor.dealer_id.is_some() && file.dealer_id == actor.dealer_id,
                Role::Customer => file.details.customer_user_id == Some(actor.id),
                _ => true,
            };
            if !in_scope {
                warn!(actor = %actor.id, file_id = %file.id, "file outside actor scope");
                return Err(ClaimError::forbidden(capability, actor.role));
            }
        }

        Ok(())
    }

    pub(crate) fn ensure_unlocked(file: &CustomerFile) -> Result<(), ClaimError> {
        if file.locked {
            return Err(ClaimError::AlreadyLocked { file_id: file.id });
        }
        Ok(())
    }

    /// Required fields, normalization, then the remaining field rules
    fn check_applicant(&self, candidate: &ApplicantCandidate) -> Result<NormalizedIdentity, ClaimError> {
        if let Some(field) = ApplicantValidator::missing_required_fields(candidate).first() {
            return Err(ClaimError::missing(*field));
        }

        let identity = NormalizedIdentity::from_candidate(candidate, self.strict_national_id)?;

        let result = ApplicantValidator::validate(candidate, self.strict_national_id);
        for warning in &result.warnings {
            warn!(%warning, "applicant accepted with warning");
        }
        if !result.is_valid {
            return Err(ClaimError::validation(result.errors.join("; ")));
        }

        Ok(identity)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_file(&self, actor: &Actor, file_id: CustomerFileId) -> Result<CustomerFile, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::ViewFile, Some(&file))?;
        Ok(file)
    }

    pub async fn list_payments(&self, actor: &Actor, file_id: CustomerFileId) -> Result<Vec<Payment>, ClaimError> {
        self.get_file(actor, file_id).await?;
        Ok(self.store.list_payments(file_id).await?)
    }

    pub async fn list_notes(&self, actor: &Actor, file_id: CustomerFileId) -> Result<Vec<Note>, ClaimError> {
        self.get_file(actor, file_id).await?;
        Ok(self.store.list_notes(file_id).await?)
    }

    /// Evaluates the file's documents against its type without writing anything
    pub async fn document_report(&self, actor: &Actor, file_id: CustomerFileId) -> Result<DocumentReport, ClaimError> {
        let file = self.get_file(actor, file_id).await?;
        let file_type = self.store.get_file_type(file.file_type_id).await?;
        let documents = self.store.list_documents(file_id).await?;
        let completeness = evaluate(&file_type.required_codes(), &documents, self.match_mode);

        let requirements = file_type
            .requirements
            .iter()
            .map(|r| RequirementState {
                code: r.code.clone(),
                label: r.label.clone(),
                required: r.required,
                satisfied: is_satisfied(&r.code, &documents, self.match_mode),
            })
            .collect();

        Ok(DocumentReport {
            file_id,
            status: file.status,
            document_status: file.document_status,
            complete: completeness.complete,
            missing: completeness.missing,
            requirements,
            documents,
        })
    }

    // ------------------------------------------------------------------
    // Intake and details
    // ------------------------------------------------------------------

    /// Opens a new file after validation and the duplicate check
    #[instrument(skip_all, fields(actor = %actor.id))]
    pub async fn create_file(&self, actor: &Actor, intake: FileIntake) -> Result<CustomerFile, ClaimError> {
        self.authorize(actor, Capability::CreateFile, None)?;
        let identity = self.check_applicant(&intake.applicant)?;
        let file_type = self.store.get_file_type(intake.file_type_id).await?;

        if let Some(report) = self
            .detector
            .find_conflicts(&intake.applicant, self.store.as_ref(), None)
            .await?
        {
            info!(existing = %report.existing_file_id, fields = ?report.field_names(), "duplicate applicant rejected");
            return Err(report.into());
        }

        let (status, document_status) = if file_type.has_required_documents() {
            (FileStatus::DocumentStage, DocumentStatus::Incomplete)
        } else {
            (FileStatus::ApplicationStage, DocumentStatus::Complete)
        };

        let dealer_id = match actor.role {
            Role::Dealer => actor.dealer_id,
            _ => intake.dealer_id,
        };

        let now = Utc::now();
        let file = CustomerFile {
            id: CustomerFileId::new_v7(),
            file_type_id: file_type.id,
            dealer_id,
            details: FileDetails {
                full_name: display_name(&intake.applicant.full_name),
                national_id: identity.national_id,
                phone: identity.phone,
                plate: identity.plate,
                email: non_blank(intake.applicant.email),
                damage_date: intake.damage_date,
                insurance_company: non_blank(intake.insurance_company),
                damage_description: non_blank(intake.damage_description),
                customer_user_id: intake.customer_user_id,
            },
            status,
            document_status,
            locked: false,
            closure: None,
            created_by: actor.id,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.store.create_file(&file).await?;
        info!(file_id = %file.id, status = %file.status, "customer file created");

        self.audit
            .submit(
                AuditEntry::new(AuditAction::CreateCustomer, file.entity_ref())
                    .by(actor)
                    .with_after(file.snapshot())
                    .with_audience(file.audience()),
            )
            .await;

        Ok(file)
    }

    /// Edits applicant or damage details, re-running the duplicate check
    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn update_details(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        update: FileDetailsUpdate,
    ) -> Result<CustomerFile, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::UpdateFile, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        if update.is_empty() {
            return Ok(file);
        }

        let merged = file.details.merged(&update);
        let candidate = merged.candidate();
        let identity = self.check_applicant(&candidate)?;

        if update.touches_identity() {
            if let Some(report) = self
                .detector
                .find_conflicts(&candidate, self.store.as_ref(), Some(file_id))
                .await?
            {
                return Err(report.into());
            }
        }

        let full_name = display_name(&merged.full_name);
        let details = FileDetails {
            full_name,
            national_id: identity.national_id,
            phone: identity.phone,
            plate: identity.plate,
            email: non_blank(merged.email),
            insurance_company: non_blank(merged.insurance_company),
            damage_description: non_blank(merged.damage_description),
            ..merged
        };

        let updated = self
            .store
            .update_file_atomic(file_id, file.version, &FilePatch::details(details))
            .await?;

        self.audit
            .submit(
                AuditEntry::new(AuditAction::UpdateCustomer, updated.entity_ref())
                    .by(actor)
                    .with_before(file.details.snapshot())
                    .with_after(updated.details.snapshot())
                    .with_audience(updated.audience()),
            )
            .await;

        Ok(updated)
    }

    /// Removes an open file; closed files are kept forever
    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn delete_file(&self, actor: &Actor, file_id: CustomerFileId) -> Result<(), ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::DeleteFile, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        self.store.delete_file(file_id).await?;
        info!("customer file deleted");

        self.audit
            .submit(
                AuditEntry::new(AuditAction::DeleteCustomer, file.entity_ref())
                    .by(actor)
                    .with_before(file.snapshot())
                    .with_audience(file.audience()),
            )
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Attaches a document and refreshes completeness
    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn add_document(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        upload: DocumentUpload,
    ) -> Result<DocumentChange, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::UploadDocument, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        if upload.type_code.trim().is_empty() {
            return Err(ClaimError::missing("type_code"));
        }
        if upload.content_ref.trim().is_empty() {
            return Err(ClaimError::missing("content_ref"));
        }

        let document = upload.into_document(file_id, actor.id, Utc::now());
        self.store.create_document(&document).await?;
        debug!(document_id = %document.id, type_code = %document.type_code, "document stored");

        self.audit
            .submit(
                AuditEntry::new(AuditAction::UploadDocument, file.entity_ref())
                    .by(actor)
                    .with_after(json!({
                        "document_id": document.id.to_string(),
                        "type_code": document.type_code,
                        "original_name": document.original_name,
                    }))
                    .with_audience(file.audience()),
            )
            .await;

        let (file, completeness) = self.refresh_completeness(actor, file_id).await?;
        Ok(DocumentChange { document, file, completeness })
    }

    /// Approves or rejects a document and refreshes completeness
    #[instrument(skip_all, fields(actor = %actor.id, document_id = %document_id))]
    pub async fn review_document(
        &self,
        actor: &Actor,
        document_id: DocumentId,
        approval: ApprovalStatus,
        note: Option<String>,
    ) -> Result<DocumentChange, ClaimError> {
        if approval == ApprovalStatus::Pending {
            return Err(ClaimError::invalid_field("approval", "a review must approve or reject"));
        }

        let document = self.store.get_document(document_id).await?;
        let file = self.store.get_file(document.file_id).await?;
        self.authorize(actor, Capability::ReviewDocument, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        let note = non_blank(note);
        let reviewed = self
            .store
            .update_document_status(document_id, approval, note.as_deref())
            .await?;

        self.audit
            .submit(
                AuditEntry::new(AuditAction::ReviewDocument, file.entity_ref())
                    .by(actor)
                    .with_before(json!({ "approval": document.approval.as_str() }))
                    .with_after(json!({
                        "document_id": reviewed.id.to_string(),
                        "type_code": reviewed.type_code,
                        "approval": reviewed.approval.as_str(),
                        "review_note": reviewed.review_note,
                    }))
                    .with_audience(file.audience()),
            )
            .await;

        let (file, completeness) = self.refresh_completeness(actor, file.id).await?;
        Ok(DocumentChange {
            document: reviewed,
            file,
            completeness,
        })
    }

    async fn evaluate_file(&self, file: &CustomerFile) -> Result<Completeness, ClaimError> {
        let file_type = self.store.get_file_type(file.file_type_id).await?;
        let documents = self.store.list_documents(file.id).await?;
        Ok(evaluate(&file_type.required_codes(), &documents, self.match_mode))
    }

    /// Re-reads the document set and brings status and completeness flag in line
    ///
    /// Files waiting for documents advance to the application stage once
    /// complete; other open files only get their flag refreshed. A version
    /// clash re-reads and re-evaluates, up to [`REFRESH_ATTEMPTS`] times.
    async fn refresh_completeness(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
    ) -> Result<(CustomerFile, Completeness), ClaimError> {
        for attempt in 1..=REFRESH_ATTEMPTS {
            let file = self.store.get_file(file_id).await?;
            let completeness = self.evaluate_file(&file).await?;

            if file.locked {
                return Ok((file, completeness));
            }

            let target_status = if file.status.is_pre_review() && completeness.complete {
                FileStatus::ApplicationStage
            } else {
                file.status
            };
            let target_documents = completeness.document_status();

            if target_status == file.status && target_documents == file.document_status {
                return Ok((file, completeness));
            }

            let mut patch = FilePatch::document_status(target_documents);
            if target_status != file.status {
                patch = patch.with_status(target_status);
            }

            match self.store.update_file_atomic(file_id, file.version, &patch).await {
                Ok(updated) => {
                    if updated.status != file.status {
                        info!(from = %file.status, to = %updated.status, "documents complete, status advanced");
                        self.audit_status_change(actor, &file, &updated).await;
                    }
                    return Ok((updated, completeness));
                }
                Err(PortError::StaleVersion { .. }) | Err(PortError::Locked { .. }) => {
                    debug!(attempt, "file changed during completeness refresh, re-evaluating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ClaimError::ConcurrentModification { file_id })
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Moves an open file to another open status
    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        target: FileStatus,
    ) -> Result<CustomerFile, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::UpdateStatus, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        if !file.status.can_transition_to(target) {
            return Err(ClaimError::InvalidTransition {
                from: file.status,
                to: target,
            });
        }
        if file.status == target {
            return Ok(file);
        }

        let updated = self
            .store
            .update_file_atomic(file_id, file.version, &FilePatch::status(target))
            .await?;
        info!(from = %file.status, to = %updated.status, "status changed");

        self.audit_status_change(actor, &file, &updated).await;
        Ok(updated)
    }

    async fn audit_status_change(&self, actor: &Actor, before: &CustomerFile, after: &CustomerFile) {
        self.audit
            .submit(
                AuditEntry::new(AuditAction::UpdateStatus, after.entity_ref())
                    .by(actor)
                    .with_before(before.status_snapshot())
                    .with_after(after.status_snapshot())
                    .with_audience(after.audience()),
            )
            .await;
    }

    // ------------------------------------------------------------------
    // Money and notes
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn record_payment(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        payment: NewPayment,
    ) -> Result<Payment, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::RecordPayment, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        if !payment.amount.is_positive() {
            return Err(ClaimError::invalid_field("amount", "payment amount must be positive"));
        }

        let payment = payment.into_payment(file_id, actor.id, Utc::now());
        self.store.create_payment(&payment).await?;

        self.audit
            .submit(
                AuditEntry::new(AuditAction::CreatePayment, file.entity_ref())
                    .by(actor)
                    .with_after(json!({
                        "payment_id": payment.id.to_string(),
                        "amount": payment.amount.amount().to_string(),
                        "currency": payment.amount.currency().code(),
                        "kind": payment.kind.as_str(),
                    }))
                    .with_audience(file.audience()),
            )
            .await;

        Ok(payment)
    }

    /// Adds a note; allowed on locked files too
    pub async fn append_note(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        body: &str,
    ) -> Result<Note, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::AppendNote, Some(&file))?;

        let body = body.trim();
        if body.is_empty() {
            return Err(ClaimError::missing("body"));
        }

        let note = Note::new(file_id, actor.id, body, Utc::now());
        self.store.append_note(&note).await?;

        self.audit
            .submit(
                AuditEntry::new(AuditAction::AddNote, file.entity_ref())
                    .by(actor)
                    .with_after(json!({ "note_id": note.id.to_string(), "body": note.body }))
                    .with_audience(file.audience()),
            )
            .await;

        Ok(note)
    }

    // ------------------------------------------------------------------
    // Sign-in events
    // ------------------------------------------------------------------

    /// Records a successful sign-in reported by the identity provider
    pub async fn record_login(&self, actor: &Actor) {
        self.audit.submit(AuditEntry::login(actor)).await;
    }

    /// Records a failed sign-in attempt
    pub async fn record_login_failed(&self, username: &str) {
        self.audit.submit(AuditEntry::login_failed(username)).await;
    }
}
