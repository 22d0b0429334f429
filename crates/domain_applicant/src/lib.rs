//! Applicant Identity Domain
//!
//! Everything needed to decide whether an incoming applicant is somebody the
//! office already has a file for:
//!
//! - **normalize**: canonical forms for national ID, phone, plate and name
//! - **validation**: required fields, e-mail shape and the national ID checksum
//! - **duplicate**: the two-pass duplicate detector
//! - **ports**: the pre-filter lookup the detector queries
//!
//! # Example
//!
//! ```rust
//! use domain_applicant::normalize::{normalize_phone, normalize_plate};
//!
//! assert_eq!(normalize_phone("+90 (532) 123 45 67").unwrap(), "05321234567");
//! assert_eq!(normalize_plate("34 abc 123"), "34ABC123");
//! ```

pub mod applicant;
pub mod normalize;
pub mod validation;
pub mod duplicate;
pub mod ports;
pub mod error;

pub use applicant::{ApplicantCandidate, StoredApplicant};
pub use normalize::{
    normalize_phone, normalize_national_id, normalize_plate, normalize_name,
    NormalizedIdentity,
};
pub use validation::{ApplicantValidator, ValidationResult, national_id_checksum_valid};
pub use duplicate::{DuplicateDetector, ConflictReport, MatchedField};
pub use ports::{ApplicantLookup, LooseQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryApplicantLookup;
pub use error::{NormalizationError, DuplicateError};
