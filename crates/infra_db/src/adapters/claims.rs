//! PostgreSQL Claims Store Adapter
//!
//! Implements [`ClaimsStore`] and [`ApplicantLookup`] on top of
//! [`CustomerFileRepository`].
//!
//! `update_file_atomic` reads the row, applies the [`FilePatch`] in memory
//! and writes the result back with a single
//! `UPDATE ... WHERE id = $1 AND version = $2 AND NOT locked RETURNING ...`.
//! The guard makes the read-modify-write a compare-and-set: if anything
//! moved in between, no row matches and the miss is reported as `Locked`
//! or `StaleVersion`.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    Currency, CustomerFileId, DealerId, DocumentId, DomainPort, FileTypeId, HealthCheckResult,
    HealthCheckable, Money, NoteId, PaymentId, PortError, UserId,
};
use domain_applicant::{normalize_name, ApplicantLookup, LooseQuery, StoredApplicant};
use domain_claims::{
    ApprovalStatus, ClaimsStore, Closure, CustomerFile, Document, DocumentRequirement,
    DocumentStatus, FileDetails, FilePatch, FileStatus, FileType, Note, Payment, PaymentKind,
    Settlement,
};

use crate::error::DatabaseError;
use crate::repositories::customer_file::{
    self as db, ApplicantRow, CustomerFileRepository, DocumentRow, FileRow, FileTypeRow, NoteRow,
    PaymentRow, RequirementRow,
};

const FILE: &str = "CustomerFile";

/// PostgreSQL-backed implementation of [`ClaimsStore`]
#[derive(Debug, Clone)]
pub struct PostgresClaimsStore {
    repository: CustomerFileRepository,
}

impl PostgresClaimsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CustomerFileRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &CustomerFileRepository {
        &self.repository
    }

    /// Stores a file type template; used by seeders and tests
    pub async fn insert_file_type(&self, file_type: &FileType) -> Result<(), PortError> {
        let row = FileTypeRow {
            id: *file_type.id.as_uuid(),
            name: file_type.name.clone(),
        };
        let requirements: Vec<RequirementRow> = file_type
            .requirements
            .iter()
            .map(|r| RequirementRow {
                code: r.code.clone(),
                label: r.label.clone(),
                required: r.required,
            })
            .collect();

        self.repository.insert_file_type(&row, &requirements).await?;
        Ok(())
    }
}

impl DomainPort for PostgresClaimsStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimsStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(self.repository.pool(), "postgres-claims-store").await
    }
}

#[async_trait]
impl ApplicantLookup for PostgresClaimsStore {
    async fn find_loose(&self, query: &LooseQuery) -> Result<Vec<StoredApplicant>, PortError> {
        let rows = self
            .repository
            .find_loose(&query.national_id, &query.plate, &query.name)
            .await?;
        Ok(rows.into_iter().map(row_to_applicant).collect())
    }

    async fn find_by_phone_prefix(&self, prefix: &str) -> Result<Vec<StoredApplicant>, PortError> {
        let rows = self.repository.find_by_phone_prefix(prefix).await?;
        Ok(rows.into_iter().map(row_to_applicant).collect())
    }
}

#[async_trait]
impl ClaimsStore for PostgresClaimsStore {
    #[instrument(skip(self), fields(file_id = %id))]
    async fn get_file(&self, id: CustomerFileId) -> Result<CustomerFile, PortError> {
        let row = self.repository.get(*id.as_uuid()).await?;
        Ok(row_to_file(row)?)
    }

    async fn get_file_type(&self, id: FileTypeId) -> Result<FileType, PortError> {
        let (file_type, requirements) = self.repository.get_file_type(*id.as_uuid()).await?;
        Ok(FileType {
            id: FileTypeId::from_uuid(file_type.id),
            name: file_type.name,
            requirements: requirements
                .into_iter()
                .map(|r| DocumentRequirement {
                    code: r.code,
                    label: r.label,
                    required: r.required,
                })
                .collect(),
        })
    }

    #[instrument(skip_all, fields(file_id = %file.id))]
    async fn create_file(&self, file: &CustomerFile) -> Result<(), PortError> {
        self.repository.insert(&file_to_row(file)).await?;
        Ok(())
    }

    #[instrument(skip(self, patch), fields(file_id = %id))]
    async fn update_file_atomic(
        &self,
        id: CustomerFileId,
        expected_version: i64,
        patch: &FilePatch,
    ) -> Result<CustomerFile, PortError> {
        let mut file = row_to_file(self.repository.get(*id.as_uuid()).await?)?;

        if file.locked {
            return Err(PortError::locked(FILE, id));
        }
        if file.version != expected_version {
            return Err(PortError::stale(FILE, id, expected_version));
        }

        patch.apply_to(&mut file, Utc::now());
        let stored = self
            .repository
            .compare_and_set(&file_to_row(&file), expected_version)
            .await?;

        debug!(version = stored.version, locked = stored.locked, "customer file updated");
        Ok(row_to_file(stored)?)
    }

    async fn delete_file(&self, id: CustomerFileId) -> Result<(), PortError> {
        self.repository.delete(*id.as_uuid()).await?;
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Document, PortError> {
        let row = self.repository.get_document(*id.as_uuid()).await?;
        Ok(row_to_document(row))
    }

    async fn list_documents(&self, file_id: CustomerFileId) -> Result<Vec<Document>, PortError> {
        let rows = self.repository.list_documents(*file_id.as_uuid()).await?;
        Ok(rows.into_iter().map(row_to_document).collect())
    }

    async fn create_document(&self, document: &Document) -> Result<(), PortError> {
        let row = DocumentRow {
            id: *document.id.as_uuid(),
            file_id: *document.file_id.as_uuid(),
            type_code: document.type_code.clone(),
            content_ref: document.content_ref.clone(),
            approval: approval_to_db(document.approval),
            uploaded_by: document.uploaded_by.value(),
            original_name: document.original_name.clone(),
            review_note: document.review_note.clone(),
            uploaded_at: document.uploaded_at,
        };
        self.repository.insert_document(&row).await?;
        Ok(())
    }

    async fn update_document_status(
        &self,
        id: DocumentId,
        approval: ApprovalStatus,
        review_note: Option<&str>,
    ) -> Result<Document, PortError> {
        let row = self
            .repository
            .review_document(*id.as_uuid(), approval_to_db(approval), review_note)
            .await?;
        Ok(row_to_document(row))
    }

    async fn create_payment(&self, payment: &Payment) -> Result<(), PortError> {
        let row = PaymentRow {
            id: *payment.id.as_uuid(),
            file_id: *payment.file_id.as_uuid(),
            amount: payment.amount.amount(),
            currency: payment.amount.currency().code().to_string(),
            kind: match payment.kind {
                PaymentKind::Incoming => db::PaymentKind::Incoming,
                PaymentKind::Outgoing => db::PaymentKind::Outgoing,
            },
            description: payment.description.clone(),
            paid_at: payment.paid_at,
            recorded_by: payment.recorded_by.value(),
        };
        self.repository.insert_payment(&row).await?;
        Ok(())
    }

    async fn list_payments(&self, file_id: CustomerFileId) -> Result<Vec<Payment>, PortError> {
        let rows = self.repository.list_payments(*file_id.as_uuid()).await?;
        let payments = rows
            .into_iter()
            .map(|row| {
                Ok(Payment {
                    id: PaymentId::from_uuid(row.id),
                    file_id: CustomerFileId::from_uuid(row.file_id),
                    amount: Money::new(row.amount, parse_currency(&row.currency)?),
                    kind: match row.kind {
                        db::PaymentKind::Incoming => PaymentKind::Incoming,
                        db::PaymentKind::Outgoing => PaymentKind::Outgoing,
                    },
                    description: row.description,
                    paid_at: row.paid_at,
                    recorded_by: UserId::new(row.recorded_by),
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        Ok(payments)
    }

    async fn append_note(&self, note: &Note) -> Result<(), PortError> {
        let row = NoteRow {
            id: *note.id.as_uuid(),
            file_id: *note.file_id.as_uuid(),
            author: note.author.value(),
            body: note.body.clone(),
            created_at: note.created_at,
        };
        self.repository.insert_note(&row).await?;
        Ok(())
    }

    async fn list_notes(&self, file_id: CustomerFileId) -> Result<Vec<Note>, PortError> {
        let rows = self.repository.list_notes(*file_id.as_uuid()).await?;
        Ok(rows
            .into_iter()
            .map(|row| Note {
                id: NoteId::from_uuid(row.id),
                file_id: CustomerFileId::from_uuid(row.file_id),
                author: UserId::new(row.author),
                body: row.body,
                created_at: row.created_at,
            })
            .collect())
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn row_to_applicant(row: ApplicantRow) -> StoredApplicant {
    StoredApplicant {
        file_id: CustomerFileId::from_uuid(row.id),
        full_name: row.full_name,
        national_id: row.national_id,
        phone: row.phone,
        plate: row.plate,
    }
}

fn status_to_db(status: FileStatus) -> db::FileStatus {
    match status {
        FileStatus::Reviewing => db::FileStatus::Reviewing,
        FileStatus::DocumentStage => db::FileStatus::DocumentStage,
        FileStatus::ApplicationStage => db::FileStatus::ApplicationStage,
        FileStatus::LitigationStage => db::FileStatus::LitigationStage,
        FileStatus::Approved => db::FileStatus::Approved,
        FileStatus::Completed => db::FileStatus::Completed,
        FileStatus::OnHold => db::FileStatus::OnHold,
        FileStatus::Closed => db::FileStatus::Closed,
    }
}

fn status_from_db(status: db::FileStatus) -> FileStatus {
    match status {
        db::FileStatus::Reviewing => FileStatus::Reviewing,
        db::FileStatus::DocumentStage => FileStatus::DocumentStage,
        db::FileStatus::ApplicationStage => FileStatus::ApplicationStage,
        db::FileStatus::LitigationStage => FileStatus::LitigationStage,
        db::FileStatus::Approved => FileStatus::Approved,
        db::FileStatus::Completed => FileStatus::Completed,
        db::FileStatus::OnHold => FileStatus::OnHold,
        db::FileStatus::Closed => FileStatus::Closed,
    }
}

fn approval_to_db(approval: ApprovalStatus) -> db::ApprovalStatus {
    match approval {
        ApprovalStatus::Pending => db::ApprovalStatus::Pending,
        ApprovalStatus::Approved => db::ApprovalStatus::Approved,
        ApprovalStatus::Rejected => db::ApprovalStatus::Rejected,
    }
}

fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    code.parse().map_err(|e| DatabaseError::decode("currency", e))
}

fn file_to_row(file: &CustomerFile) -> FileRow {
    let details = &file.details;
    let settlement = file.closure.as_ref().map(|c| &c.settlement);
    let figure = |pick: fn(&Settlement) -> Option<Money>| settlement.and_then(pick);

    let figures = [
        figure(|s| s.gross_payout),
        figure(|s| s.expenses),
        figure(|s| s.dealer_commission),
        figure(|s| s.net_profit),
    ];
    let settlement_currency = figures
        .iter()
        .flatten()
        .next()
        .map(|m| m.currency().code().to_string());
    let amount = |m: Option<Money>| m.map(|m| m.amount());

    FileRow {
        id: *file.id.as_uuid(),
        file_type_id: *file.file_type_id.as_uuid(),
        dealer_id: file.dealer_id.map(|d| d.value()),
        full_name: details.full_name.clone(),
        full_name_normalized: normalize_name(&details.full_name),
        national_id: details.national_id.clone(),
        phone: details.phone.clone(),
        plate: details.plate.clone(),
        email: details.email.clone(),
        damage_date: details.damage_date,
        insurance_company: details.insurance_company.clone(),
        damage_description: details.damage_description.clone(),
        customer_user_id: details.customer_user_id.map(|u| u.value()),
        status: status_to_db(file.status),
        document_status: match file.document_status {
            DocumentStatus::Complete => db::DocumentStatus::Complete,
            DocumentStatus::Incomplete => db::DocumentStatus::Incomplete,
        },
        locked: file.locked,
        closure_reason: file.closure.as_ref().map(|c| c.reason.clone()),
        closed_at: file.closure.as_ref().map(|c| c.closed_at),
        settlement_currency,
        gross_payout: amount(figures[0]),
        expenses: amount(figures[1]),
        dealer_commission: amount(figures[2]),
        net_profit: amount(figures[3]),
        created_by: file.created_by.value(),
        version: file.version,
        created_at: file.created_at,
        updated_at: file.updated_at,
    }
}

fn row_to_file(row: FileRow) -> Result<CustomerFile, DatabaseError> {
    let closure = match (row.closure_reason, row.closed_at) {
        (Some(reason), Some(closed_at)) => {
            let currency = match row.settlement_currency.as_deref() {
                Some(code) => parse_currency(code)?,
                None => Currency::default(),
            };
            let money = |amount: Option<Decimal>| amount.map(|a| Money::new(a, currency));
            Some(Closure {
                reason,
                closed_at,
                settlement: Settlement {
                    gross_payout: money(row.gross_payout),
                    expenses: money(row.expenses),
                    dealer_commission: money(row.dealer_commission),
                    net_profit: money(row.net_profit),
                },
            })
        }
        _ => None,
    };

    Ok(CustomerFile {
        id: CustomerFileId::from_uuid(row.id),
        file_type_id: FileTypeId::from_uuid(row.file_type_id),
        dealer_id: row.dealer_id.map(DealerId::new),
        details: FileDetails {
            full_name: row.full_name,
            national_id: row.national_id,
            phone: row.phone,
            plate: row.plate,
            email: row.email,
            damage_date: row.damage_date,
            insurance_company: row.insurance_company,
            damage_description: row.damage_description,
            customer_user_id: row.customer_user_id.map(UserId::new),
        },
        status: status_from_db(row.status),
        document_status: match row.document_status {
            db::DocumentStatus::Complete => DocumentStatus::Complete,
            db::DocumentStatus::Incomplete => DocumentStatus::Incomplete,
        },
        locked: row.locked,
        closure,
        created_by: UserId::new(row.created_by),
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_document(row: DocumentRow) -> Document {
    Document {
        id: DocumentId::from_uuid(row.id),
        file_id: CustomerFileId::from_uuid(row.file_id),
        type_code: row.type_code,
        content_ref: row.content_ref,
        approval: match row.approval {
            db::ApprovalStatus::Pending => ApprovalStatus::Pending,
            db::ApprovalStatus::Approved => ApprovalStatus::Approved,
            db::ApprovalStatus::Rejected => ApprovalStatus::Rejected,
        },
        uploaded_by: UserId::new(row.uploaded_by),
        original_name: row.original_name,
        review_note: row.review_note,
        uploaded_at: row.uploaded_at,
    }
}
