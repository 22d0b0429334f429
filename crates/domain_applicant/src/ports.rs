//! Applicant Lookup Port
//!
//! The duplicate detector does not scan every file. It asks the store for a
//! small candidate set through [`ApplicantLookup`] and then compares the
//! candidates itself after normalization. Adapters only have to guarantee
//! recall: every row whose canonical national ID, plate or name equals the
//! query must be returned. Returning extra rows is harmless.
//!
//! ```rust,ignore
//! let hits = lookup.find_loose(&LooseQuery::from_identity(&identity)).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;

use crate::applicant::StoredApplicant;
use crate::normalize::{normalize_name, normalize_phone, normalize_plate, NormalizedIdentity};

/// Canonical values used for the first pre-filter pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooseQuery {
    pub national_id: String,
    pub plate: String,
    pub name: String,
}

impl LooseQuery {
    /// Builds the query from an already normalized identity
    pub fn from_identity(identity: &NormalizedIdentity) -> Self {
        Self {
            national_id: identity.national_id.clone(),
            plate: identity.plate.clone(),
            name: identity.name.clone(),
        }
    }

    /// Returns true when a stored row should be part of the candidate set
    ///
    /// In-memory adapters use this directly; SQL adapters express the same
    /// predicate over their normalized columns.
    pub fn admits(&self, stored: &StoredApplicant) -> bool {
        let stored_id: String = stored.national_id.chars().filter(char::is_ascii_digit).collect();
        let stored_plate = normalize_plate(&stored.plate);
        let stored_name = normalize_name(&stored.full_name);

        (!self.national_id.is_empty() && stored_id == self.national_id)
            || (!self.plate.is_empty() && stored_plate == self.plate)
            || (!self.name.is_empty() && stored_name == self.name)
    }
}

/// Returns true when the stored phone starts with the given canonical prefix
///
/// Unparseable stored phones fall back to their raw digits.
pub fn phone_prefix_admits(prefix: &str, stored: &StoredApplicant) -> bool {
    let phone = normalize_phone(&stored.phone)
        .unwrap_or_else(|_| stored.phone.chars().filter(char::is_ascii_digit).collect());
    phone.starts_with(prefix)
}

/// Pre-filter queries the duplicate detector issues against the file store
#[async_trait]
pub trait ApplicantLookup: Send + Sync {
    /// Files whose national ID, plate or name loosely equals the query
    async fn find_loose(&self, query: &LooseQuery) -> Result<Vec<StoredApplicant>, PortError>;

    /// Files whose phone starts with the given canonical prefix
    async fn find_by_phone_prefix(&self, prefix: &str) -> Result<Vec<StoredApplicant>, PortError>;
}

/// In-memory lookup for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory implementation of [`ApplicantLookup`]
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryApplicantLookup {
        applicants: Arc<RwLock<Vec<StoredApplicant>>>,
    }

    impl InMemoryApplicantLookup {
        /// Creates an empty lookup
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with stored applicants
        pub async fn with_applicants(applicants: Vec<StoredApplicant>) -> Self {
            let lookup = Self::new();
            lookup.applicants.write().await.extend(applicants);
            lookup
        }

        /// Adds a single applicant
        pub async fn insert(&self, applicant: StoredApplicant) {
            self.applicants.write().await.push(applicant);
        }
    }

    #[async_trait]
    impl ApplicantLookup for InMemoryApplicantLookup {
        async fn find_loose(&self, query: &LooseQuery) -> Result<Vec<StoredApplicant>, PortError> {
            Ok(self
                .applicants
                .read()
                .await
                .iter()
                .filter(|a| query.admits(a))
                .cloned()
                .collect())
        }

        async fn find_by_phone_prefix(&self, prefix: &str) -> Result<Vec<StoredApplicant>, PortError> {
            Ok(self
                .applicants
                .read()
                .await
                .iter()
                .filter(|a| phone_prefix_admits(prefix, a))
                .cloned()
                .collect())
        }
    }

}
