//! Test Data Builders
//!
//! Builders that let a test name only the fields it cares about. The
//! [`CustomerFileBuilder`] produces stored files directly, bypassing the
//! lifecycle service, for store-level tests.

use chrono::{DateTime, Utc};

use core_kernel::{CustomerFileId, DealerId, DocumentId, FileTypeId, Money, UserId};
use domain_applicant::{ApplicantCandidate, NormalizedIdentity};
use domain_claims::{
    ApprovalStatus, Closure, CustomerFile, Document, DocumentStatus, FileDetails, FileIntake,
    FileStatus, Settlement,
};

use crate::fixtures::{ApplicantFixtures, TemporalFixtures, UserFixtures};

/// Builder for intake requests
pub struct FileIntakeBuilder {
    file_type_id: FileTypeId,
    applicant: ApplicantCandidate,
    customer_user_id: Option<UserId>,
    dealer_id: Option<DealerId>,
    insurance_company: Option<String>,
}

impl FileIntakeBuilder {
    pub fn new(file_type_id: FileTypeId) -> Self {
        Self {
            file_type_id,
            applicant: ApplicantFixtures::ali_veli(),
            customer_user_id: None,
            dealer_id: None,
            insurance_company: None,
        }
    }

    pub fn applicant(mut self, applicant: ApplicantCandidate) -> Self {
        self.applicant = applicant;
        self
    }

    /// Links the fixture customer login, who then hears about status changes
    pub fn for_customer_login(mut self) -> Self {
        self.customer_user_id = Some(UserFixtures::CUSTOMER);
        self
    }

    pub fn dealer(mut self, dealer_id: DealerId) -> Self {
        self.dealer_id = Some(dealer_id);
        self
    }

    pub fn insurance_company(mut self, name: impl Into<String>) -> Self {
        self.insurance_company = Some(name.into());
        self
    }

    pub fn build(self) -> FileIntake {
        let mut intake = FileIntake::new(self.file_type_id, self.applicant);
        intake.damage_date = Some(TemporalFixtures::damage_date());
        intake.customer_user_id = self.customer_user_id;
        intake.dealer_id = self.dealer_id;
        intake.insurance_company = self.insurance_company;
        intake
    }
}

/// Builder for stored customer files
pub struct CustomerFileBuilder {
    file_type_id: FileTypeId,
    applicant: ApplicantCandidate,
    dealer_id: Option<DealerId>,
    status: FileStatus,
    document_status: DocumentStatus,
    closure: Option<Closure>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl CustomerFileBuilder {
    pub fn new(file_type_id: FileTypeId) -> Self {
        Self {
            file_type_id,
            applicant: ApplicantFixtures::ali_veli(),
            dealer_id: None,
            status: FileStatus::DocumentStage,
            document_status: DocumentStatus::Incomplete,
            closure: None,
            version: 1,
            created_at: TemporalFixtures::intake_time(),
        }
    }

    pub fn applicant(mut self, applicant: ApplicantCandidate) -> Self {
        self.applicant = applicant;
        self
    }

    pub fn dealer(mut self, dealer_id: DealerId) -> Self {
        self.dealer_id = Some(dealer_id);
        self
    }

    pub fn status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn document_status(mut self, document_status: DocumentStatus) -> Self {
        self.document_status = document_status;
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// A closed, locked file with the given net entitlement
    pub fn closed(mut self, reason: impl Into<String>, net_profit: Option<Money>) -> Self {
        self.status = FileStatus::Closed;
        self.closure = Some(Closure {
            reason: reason.into(),
            closed_at: self.created_at,
            settlement: Settlement {
                net_profit,
                ..Settlement::default()
            },
        });
        self
    }

    /// Builds the file with canonical identity fields
    ///
    /// Panics if the applicant does not normalize; builders are for tests.
    pub fn build(self) -> CustomerFile {
        let identity = NormalizedIdentity::from_candidate(&self.applicant, false)
            .expect("builder applicant must normalize");

        CustomerFile {
            id: CustomerFileId::new_v7(),
            file_type_id: self.file_type_id,
            dealer_id: self.dealer_id,
            details: FileDetails {
                full_name: self.applicant.full_name.trim().to_string(),
                national_id: identity.national_id,
                phone: identity.phone,
                plate: identity.plate,
                email: self.applicant.email.clone(),
                damage_date: Some(TemporalFixtures::damage_date()),
                insurance_company: None,
                damage_description: None,
                customer_user_id: None,
            },
            locked: self.closure.is_some(),
            status: self.status,
            document_status: self.document_status,
            closure: self.closure,
            created_by: UserFixtures::ADMIN,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Builder for stored documents
pub struct DocumentBuilder {
    file_id: CustomerFileId,
    type_code: String,
    approval: ApprovalStatus,
}

impl DocumentBuilder {
    pub fn new(file_id: CustomerFileId, type_code: impl Into<String>) -> Self {
        Self {
            file_id,
            type_code: type_code.into(),
            approval: ApprovalStatus::Pending,
        }
    }

    pub fn approval(mut self, approval: ApprovalStatus) -> Self {
        self.approval = approval;
        self
    }

    pub fn build(self) -> Document {
        Document {
            id: DocumentId::new_v7(),
            file_id: self.file_id,
            content_ref: format!("blob://{}/{}", self.file_id, self.type_code),
            type_code: self.type_code,
            approval: self.approval,
            uploaded_by: UserFixtures::STAFF,
            original_name: None,
            review_note: None,
            uploaded_at: TemporalFixtures::intake_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_file_holds_canonical_identity() {
        let file = CustomerFileBuilder::new(FileTypeId::new())
            .applicant(ApplicantFixtures::ali_veli_reformatted())
            .build();

        assert_eq!(file.details.national_id, "10000000146");
        assert_eq!(file.details.phone, "05321234567");
        assert_eq!(file.details.plate, "34ABC123");
        assert!(!file.locked);
    }

    #[test]
    fn test_closed_builder_locks() {
        let file = CustomerFileBuilder::new(FileTypeId::new())
            .closed("Withdrawn", None)
            .build();
        assert!(file.locked);
        assert_eq!(file.status, FileStatus::Closed);
    }
}
