//! Duplicate applicant detection
//!
//! Two passes against the file store:
//!
//! 1. a loose pre-filter on national ID, plate and name, compared exactly
//!    after normalizing both sides;
//! 2. only when pass 1 found nothing, a phone-prefix pre-filter compared on
//!    phone and name.
//!
//! When several stored files collide the report for the highest priority
//! field wins (national ID, then name, then phone, then plate).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::CustomerFileId;

use crate::applicant::{ApplicantCandidate, StoredApplicant};
use crate::error::DuplicateError;
use crate::normalize::{
    normalize_name, normalize_national_id, normalize_phone, normalize_plate, NormalizedIdentity,
};
use crate::ports::{ApplicantLookup, LooseQuery};

/// Identity field on which two applicants collided
///
/// Declaration order is reporting priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    NationalId,
    Name,
    Phone,
    Plate,
}

impl MatchedField {
    /// Human label used in conflict messages
    pub fn label(&self) -> &'static str {
        match self {
            MatchedField::NationalId => "national ID",
            MatchedField::Name => "full name",
            MatchedField::Phone => "phone",
            MatchedField::Plate => "plate",
        }
    }
}

impl fmt::Display for MatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A collision between a candidate and an existing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub existing_file_id: CustomerFileId,
    pub existing_name: String,
    pub matched: BTreeSet<MatchedField>,
    /// Highest priority field in `matched`
    pub primary: MatchedField,
}

impl ConflictReport {
    fn from_matches(stored: &StoredApplicant, matched: BTreeSet<MatchedField>) -> Option<Self> {
        let primary = *matched.iter().next()?;
        Some(Self {
            existing_file_id: stored.file_id,
            existing_name: stored.full_name.clone(),
            matched,
            primary,
        })
    }

    /// Names of the matched fields in priority order
    pub fn field_names(&self) -> Vec<&'static str> {
        self.matched.iter().map(MatchedField::label).collect()
    }

    /// Message shown to the person entering the file
    pub fn message(&self) -> String {
        format!(
            "An applicant with the same {} already exists: {} (file {})",
            self.field_names().join(", "),
            self.existing_name,
            self.existing_file_id
        )
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Finds existing files that belong to the same applicant
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    strict_national_id: bool,
}

impl DuplicateDetector {
    /// Creates a detector that does not enforce the national ID checksum
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the candidate's national ID must pass the checksum
    pub fn with_strict_national_id(mut self, strict: bool) -> Self {
        self.strict_national_id = strict;
        self
    }

    /// Returns the strongest conflict for `candidate`, if any
    ///
    /// `exclude` skips a file when an existing file is being edited and must
    /// not collide with itself.
    pub async fn find_conflicts<L>(
        &self,
        candidate: &ApplicantCandidate,
        lookup: &L,
        exclude: Option<CustomerFileId>,
    ) -> Result<Option<ConflictReport>, DuplicateError>
    where
        L: ApplicantLookup + ?Sized,
    {
        let identity = NormalizedIdentity::from_candidate(candidate, self.strict_national_id)?;

        let loose_hits = lookup.find_loose(&LooseQuery::from_identity(&identity)).await?;
        debug!(hits = loose_hits.len(), "duplicate pre-filter pass 1");

        let best = Self::best_report(
            loose_hits
                .iter()
                .filter(|s| Some(s.file_id) != exclude)
                .filter_map(|s| ConflictReport::from_matches(s, Self::compare_loose(&identity, s))),
        );
        if best.is_some() {
            return Ok(best);
        }

        let phone_hits = lookup.find_by_phone_prefix(identity.phone_prefix()).await?;
        debug!(hits = phone_hits.len(), "duplicate pre-filter pass 2");

        Ok(Self::best_report(
            phone_hits
                .iter()
                .filter(|s| Some(s.file_id) != exclude)
                .filter_map(|s| ConflictReport::from_matches(s, Self::compare_phone(&identity, s))),
        ))
    }

    fn compare_loose(identity: &NormalizedIdentity, stored: &StoredApplicant) -> BTreeSet<MatchedField> {
        let mut matched = BTreeSet::new();

        if normalize_national_id(&stored.national_id).ok().as_deref() == Some(identity.national_id.as_str()) {
            matched.insert(MatchedField::NationalId);
        }
        if Self::same_name(identity, stored) {
            matched.insert(MatchedField::Name);
        }
        let plate = normalize_plate(&stored.plate);
        if !plate.is_empty() && plate == identity.plate {
            matched.insert(MatchedField::Plate);
        }

        matched
    }

    fn compare_phone(identity: &NormalizedIdentity, stored: &StoredApplicant) -> BTreeSet<MatchedField> {
        let mut matched = BTreeSet::new();

        if normalize_phone(&stored.phone).ok().as_deref() == Some(identity.phone.as_str()) {
            matched.insert(MatchedField::Phone);
        }
        if Self::same_name(identity, stored) {
            matched.insert(MatchedField::Name);
        }

        matched
    }

    fn same_name(identity: &NormalizedIdentity, stored: &StoredApplicant) -> bool {
        let name = normalize_name(&stored.full_name);
        !name.is_empty() && name == identity.name
    }

    fn best_report(reports: impl Iterator<Item = ConflictReport>) -> Option<ConflictReport> {
        reports.fold(None, |best: Option<ConflictReport>, report| match best {
            Some(current) if current.primary <= report.primary => Some(current),
            _ => Some(report),
        })
    }
}
