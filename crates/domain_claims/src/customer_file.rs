//! Customer file aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CustomerFileId, DealerId, FileTypeId, Money, UserId};
use domain_applicant::{ApplicantCandidate, StoredApplicant};
use domain_audit::{Audience, EntityRef};

/// Lifecycle status of a customer file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Received, not yet looked at
    Reviewing,
    /// Waiting for required documents
    DocumentStage,
    /// Documents complete, application filed with the insurer
    ApplicationStage,
    /// In dispute or in court
    LitigationStage,
    /// Insurer approved the claim
    Approved,
    /// Payout done, awaiting closure
    Completed,
    /// Parked
    OnHold,
    /// Settled and locked
    Closed,
}

impl FileStatus {
    pub const ALL: [FileStatus; 8] = [
        FileStatus::Reviewing,
        FileStatus::DocumentStage,
        FileStatus::ApplicationStage,
        FileStatus::LitigationStage,
        FileStatus::Approved,
        FileStatus::Completed,
        FileStatus::OnHold,
        FileStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Reviewing => "reviewing",
            FileStatus::DocumentStage => "document_stage",
            FileStatus::ApplicationStage => "application_stage",
            FileStatus::LitigationStage => "litigation_stage",
            FileStatus::Approved => "approved",
            FileStatus::Completed => "completed",
            FileStatus::OnHold => "on_hold",
            FileStatus::Closed => "closed",
        }
    }

    /// Label shown to people
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Reviewing => "Under review",
            FileStatus::DocumentStage => "Document stage",
            FileStatus::ApplicationStage => "Application stage",
            FileStatus::LitigationStage => "Litigation stage",
            FileStatus::Approved => "Approved",
            FileStatus::Completed => "Completed",
            FileStatus::OnHold => "On hold",
            FileStatus::Closed => "Closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Closed)
    }

    /// Statuses that advance automatically once documents are complete
    pub fn is_pre_review(&self) -> bool {
        matches!(self, FileStatus::Reviewing | FileStatus::DocumentStage)
    }

    /// Whether a manual status change may move from `self` to `target`
    ///
    /// Any non-terminal status may move to any other non-closed status.
    /// Closing goes through the closure handler only.
    pub fn can_transition_to(&self, target: FileStatus) -> bool {
        !self.is_terminal() && !target.is_terminal()
    }

    /// `{"status": ..., "label": ...}` as stored in audit snapshots
    pub fn snapshot(&self) -> Value {
        json!({ "status": self.as_str(), "label": self.label() })
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown file status '{}'", s))
    }
}

/// Persisted completeness flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Complete,
    Incomplete,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Complete => "complete",
            DocumentStatus::Incomplete => "incomplete",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(DocumentStatus::Complete),
            "incomplete" => Ok(DocumentStatus::Incomplete),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// Reconciled money figures of a closed file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settlement {
    pub gross_payout: Option<Money>,
    pub expenses: Option<Money>,
    pub dealer_commission: Option<Money>,
    /// What the customer is entitled to
    pub net_profit: Option<Money>,
}

/// Closure record, written once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub reason: String,
    pub closed_at: DateTime<Utc>,
    pub settlement: Settlement,
}

/// Applicant and damage details of a file
///
/// National ID, phone and plate are held in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub plate: String,
    pub email: Option<String>,
    pub damage_date: Option<NaiveDate>,
    pub insurance_company: Option<String>,
    pub damage_description: Option<String>,
    /// The customer's own login, if they have one
    pub customer_user_id: Option<UserId>,
}

impl FileDetails {
    /// The identity fields as a duplicate-check candidate
    pub fn candidate(&self) -> ApplicantCandidate {
        ApplicantCandidate {
            full_name: self.full_name.clone(),
            national_id: self.national_id.clone(),
            phone: self.phone.clone(),
            plate: self.plate.clone(),
            email: self.email.clone(),
        }
    }

    /// Applies an update, leaving unset fields alone
    pub fn merged(&self, update: &FileDetailsUpdate) -> FileDetails {
        FileDetails {
            full_name: update.full_name.clone().unwrap_or_else(|| self.full_name.clone()),
            national_id: update.national_id.clone().unwrap_or_else(|| self.national_id.clone()),
            phone: update.phone.clone().unwrap_or_else(|| self.phone.clone()),
            plate: update.plate.clone().unwrap_or_else(|| self.plate.clone()),
            email: update.email.clone().or_else(|| self.email.clone()),
            damage_date: update.damage_date.or(self.damage_date),
            insurance_company: update
                .insurance_company
                .clone()
                .or_else(|| self.insurance_company.clone()),
            damage_description: update
                .damage_description
                .clone()
                .or_else(|| self.damage_description.clone()),
            customer_user_id: update.customer_user_id.or(self.customer_user_id),
        }
    }

    pub fn snapshot(&self) -> Value {
        json!({
            "full_name": self.full_name,
            "national_id": self.national_id,
            "phone": self.phone,
            "plate": self.plate,
            "email": self.email,
            "damage_date": self.damage_date,
            "insurance_company": self.insurance_company,
            "damage_description": self.damage_description,
        })
    }
}

/// Partial update of [`FileDetails`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetailsUpdate {
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub plate: Option<String>,
    pub email: Option<String>,
    pub damage_date: Option<NaiveDate>,
    pub insurance_company: Option<String>,
    pub damage_description: Option<String>,
    pub customer_user_id: Option<UserId>,
}

impl FileDetailsUpdate {
    /// True if any identity field is touched, which re-runs the duplicate check
    pub fn touches_identity(&self) -> bool {
        self.full_name.is_some() || self.national_id.is_some() || self.phone.is_some() || self.plate.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == FileDetailsUpdate::default()
    }
}

/// Caller input for opening a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIntake {
    pub file_type_id: FileTypeId,
    pub applicant: ApplicantCandidate,
    pub damage_date: Option<NaiveDate>,
    pub insurance_company: Option<String>,
    pub damage_description: Option<String>,
    pub customer_user_id: Option<UserId>,
    /// Ignored for dealer actors, whose own dealer is used
    pub dealer_id: Option<DealerId>,
}

impl FileIntake {
    pub fn new(file_type_id: FileTypeId, applicant: ApplicantCandidate) -> Self {
        Self {
            file_type_id,
            applicant,
            damage_date: None,
            insurance_company: None,
            damage_description: None,
            customer_user_id: None,
            dealer_id: None,
        }
    }
}

/// A customer's claim file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFile {
    pub id: CustomerFileId,
    pub file_type_id: FileTypeId,
    pub dealer_id: Option<DealerId>,
    #[serde(flatten)]
    pub details: FileDetails,
    pub status: FileStatus,
    pub document_status: DocumentStatus,
    /// Set together with `status == Closed`, never cleared
    pub locked: bool,
    pub closure: Option<Closure>,
    pub created_by: UserId,
    /// Bumped by every write; compare-and-set token
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerFile {
    pub fn full_name(&self) -> &str {
        &self.details.full_name
    }

    /// Identity fields as seen by the duplicate detector
    pub fn applicant(&self) -> StoredApplicant {
        StoredApplicant {
            file_id: self.id,
            full_name: self.details.full_name.clone(),
            national_id: self.details.national_id.clone(),
            phone: self.details.phone.clone(),
            plate: self.details.plate.clone(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::customer_file(self.id, self.details.full_name.clone())
    }

    /// Parties outside the office who follow this file
    pub fn audience(&self) -> Audience {
        Audience {
            dealer_id: self.dealer_id,
            customer_user_id: self.details.customer_user_id,
        }
    }

    pub fn status_snapshot(&self) -> Value {
        self.status.snapshot()
    }

    /// Compact snapshot used for create/delete audit entries
    pub fn snapshot(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "full_name": self.details.full_name,
            "national_id": self.details.national_id,
            "status": self.status.as_str(),
            "document_status": self.document_status.as_str(),
            "dealer_id": self.dealer_id,
            "locked": self.locked,
        })
    }
}

/// The fields one atomic write may change
///
/// Only the closure handler can build a patch that closes and locks a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePatch {
    status: Option<FileStatus>,
    document_status: Option<DocumentStatus>,
    details: Option<FileDetails>,
    closure: Option<Closure>,
}

impl FilePatch {
    /// Refreshes the persisted completeness flag
    pub fn document_status(document_status: DocumentStatus) -> Self {
        Self {
            document_status: Some(document_status),
            ..Self::default()
        }
    }

    pub(crate) fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn with_status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn details(details: FileDetails) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub(crate) fn closing(closure: Closure) -> Self {
        Self {
            status: Some(FileStatus::Closed),
            closure: Some(closure),
            ..Self::default()
        }
    }

    pub fn new_status(&self) -> Option<FileStatus> {
        self.status
    }

    pub fn new_document_status(&self) -> Option<DocumentStatus> {
        self.document_status
    }

    pub fn new_details(&self) -> Option<&FileDetails> {
        self.details.as_ref()
    }

    pub fn new_closure(&self) -> Option<&Closure> {
        self.closure.as_ref()
    }

    /// The patch locks the file
    pub fn locks(&self) -> bool {
        self.closure.is_some()
    }

    /// Applies the patch in memory, bumping the version
    ///
    /// Stores call this after checking version and lock.
    pub fn apply_to(&self, file: &mut CustomerFile, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            file.status = status;
        }
        if let Some(document_status) = self.document_status {
            file.document_status = document_status;
        }
        if let Some(details) = &self.details {
            file.details = details.clone();
        }
        if let Some(closure) = &self.closure {
            file.closure = Some(closure.clone());
            file.locked = true;
        }
        file.version += 1;
        file.updated_at = now;
    }
}
