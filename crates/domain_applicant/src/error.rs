//! Applicant domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Raised when a raw identity value cannot be brought into canonical form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Phone number is not a recognisable mobile number
    #[error("Invalid phone number '{value}': expected 10, 11 or 12 digits of a mobile number")]
    InvalidPhone { value: String },

    /// National ID is not 11 digits, or fails the checksum in strict mode
    #[error("Invalid national ID '{value}': {reason}")]
    InvalidNationalId { value: String, reason: String },

    /// Plate is empty once whitespace is removed
    #[error("Invalid plate '{value}': no characters left after removing whitespace")]
    InvalidPlate { value: String },

    /// Name is empty once whitespace is collapsed
    #[error("Full name is empty")]
    EmptyName,
}

impl NormalizationError {
    /// Creates an InvalidPhone error
    pub fn phone(value: impl Into<String>) -> Self {
        NormalizationError::InvalidPhone { value: value.into() }
    }

    /// Creates an InvalidNationalId error
    pub fn national_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        NormalizationError::InvalidNationalId {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            NormalizationError::InvalidPhone { .. } => "phone",
            NormalizationError::InvalidNationalId { .. } => "national_id",
            NormalizationError::InvalidPlate { .. } => "plate",
            NormalizationError::EmptyName => "full_name",
        }
    }
}

/// Errors surfaced by the duplicate detector
#[derive(Debug, Error)]
pub enum DuplicateError {
    /// The candidate's own fields could not be normalized
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// The pre-filter lookup failed
    #[error("Applicant lookup failed: {0}")]
    Lookup(#[from] PortError),
}
