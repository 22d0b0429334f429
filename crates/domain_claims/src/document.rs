//! Documents attached to a customer file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CustomerFileId, DocumentId, UserId};

/// Review state of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Rejected documents do not count towards completeness
    pub fn counts_towards_completeness(&self) -> bool {
        !matches!(self, ApprovalStatus::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document
///
/// The content itself lives in blob storage; only its reference is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub file_id: CustomerFileId,
    pub type_code: String,
    pub content_ref: String,
    pub approval: ApprovalStatus,
    pub uploaded_by: UserId,
    pub original_name: Option<String>,
    pub review_note: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Caller input for a new document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub type_code: String,
    pub content_ref: String,
    pub original_name: Option<String>,
}

impl DocumentUpload {
    pub fn new(type_code: impl Into<String>, content_ref: impl Into<String>) -> Self {
        Self {
            type_code: type_code.into(),
            content_ref: content_ref.into(),
            original_name: None,
        }
    }

    /// Builds the pending document record
    pub fn into_document(self, file_id: CustomerFileId, uploaded_by: UserId, now: DateTime<Utc>) -> Document {
        Document {
            id: DocumentId::new_v7(),
            file_id,
            type_code: self.type_code.trim().to_string(),
            content_ref: self.content_ref,
            approval: ApprovalStatus::Pending,
            uploaded_by,
            original_name: self.original_name,
            review_note: None,
            uploaded_at: now,
        }
    }
}
