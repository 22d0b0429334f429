//! Applicant value types

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::CustomerFileId;

/// Identity details of a person applying for a new claim file
///
/// Values are kept exactly as typed; canonical forms are derived on demand
/// by [`crate::normalize::NormalizedIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ApplicantCandidate {
    /// Full name as it should be displayed
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    /// National (TC) identity number
    #[validate(length(min = 1, message = "national ID is required"))]
    pub national_id: String,
    /// Mobile phone number in any common notation
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    /// Vehicle registration plate
    #[validate(length(min = 1, message = "plate is required"))]
    pub plate: String,
    /// Optional contact e-mail
    #[validate(email(message = "e-mail address is malformed"))]
    pub email: Option<String>,
}

impl ApplicantCandidate {
    /// Creates a candidate without e-mail
    pub fn new(
        full_name: impl Into<String>,
        national_id: impl Into<String>,
        phone: impl Into<String>,
        plate: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            national_id: national_id.into(),
            phone: phone.into(),
            plate: plate.into(),
            email: None,
        }
    }

    /// Sets the e-mail address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Identity fields of an existing claim file as returned by the pre-filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApplicant {
    pub file_id: CustomerFileId,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub plate: String,
}
