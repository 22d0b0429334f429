//! Claims domain errors

use thiserror::Error;

use core_kernel::{Capability, CustomerFileId, MoneyError, PortError, Role};
use domain_applicant::{ConflictReport, DuplicateError, NormalizationError};

use crate::customer_file::FileStatus;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("{message}")]
    DuplicateApplicant {
        fields: Vec<String>,
        existing: Option<CustomerFileId>,
        message: String,
    },

    #[error("Customer file {file_id} is closed and locked")]
    AlreadyLocked { file_id: CustomerFileId },

    #[error("Customer file {file_id} was modified concurrently; reload and retry")]
    ConcurrentModification { file_id: CustomerFileId },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: FileStatus, to: FileStatus },

    #[error("Role {role} lacks capability {capability}")]
    Forbidden { capability: Capability, role: Role },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Settlement arithmetic failed: {0}")]
    Money(#[from] MoneyError),

    #[error("Store error: {0}")]
    Store(PortError),
}

impl ClaimError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ClaimError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Validation error tied to a field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ClaimError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a MissingRequiredField error
    pub fn missing(field: impl Into<String>) -> Self {
        ClaimError::MissingRequiredField { field: field.into() }
    }

    /// Creates a Forbidden error
    pub fn forbidden(capability: Capability, role: Role) -> Self {
        ClaimError::Forbidden { capability, role }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ClaimError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Returns true for errors the caller may resolve by reloading and retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ClaimError::ConcurrentModification { .. } => true,
            ClaimError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<ConflictReport> for ClaimError {
    fn from(report: ConflictReport) -> Self {
        ClaimError::DuplicateApplicant {
            fields: report.field_names().into_iter().map(str::to_string).collect(),
            existing: Some(report.existing_file_id),
            message: report.message(),
        }
    }
}

impl From<DuplicateError> for ClaimError {
    fn from(err: DuplicateError) -> Self {
        match err {
            DuplicateError::Normalization(e) => ClaimError::Normalization(e),
            DuplicateError::Lookup(e) => ClaimError::from(e),
        }
    }
}

impl From<PortError> for ClaimError {
    fn from(err: PortError) -> Self {
        let file_id = match &err {
            PortError::Locked { id, .. } | PortError::StaleVersion { id, .. } => {
                id.parse::<CustomerFileId>().ok()
            }
            _ => None,
        };

        match (err, file_id) {
            (PortError::Locked { .. }, Some(file_id)) => ClaimError::AlreadyLocked { file_id },
            (PortError::StaleVersion { .. }, Some(file_id)) => {
                ClaimError::ConcurrentModification { file_id }
            }
            (PortError::NotFound { entity_type, id }, _) => ClaimError::NotFound { entity_type, id },
            (PortError::Duplicate { field, value }, _) => ClaimError::DuplicateApplicant {
                message: format!("A customer file with the same {} ({}) already exists", field, value),
                fields: vec![field],
                existing: None,
            },
            (PortError::Validation { message, field }, _) => ClaimError::Validation { message, field },
            (other, _) => ClaimError::Store(other),
        }
    }
}
