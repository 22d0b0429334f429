//! Customer file repository
//!
//! Row types and SQL for customer files, their file types, documents,
//! payments and notes. Every write that must respect the lock is a single
//! guarded statement; when it touches no row, [`CustomerFileRepository::explain_miss`]
//! works out whether the file is missing, locked or at another version.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

const FILE: &str = "CustomerFile";

const FILE_COLUMNS: &str = r#"
    id, file_type_id, dealer_id,
    full_name, full_name_normalized, national_id, phone, plate, email,
    damage_date, insurance_company, damage_description, customer_user_id,
    status, document_status, locked,
    closure_reason, closed_at, settlement_currency,
    gross_payout, expenses, dealer_commission, net_profit,
    created_by, version, created_at, updated_at
"#;

const DOCUMENT_COLUMNS: &str = r#"
    id, file_id, type_code, content_ref, approval,
    uploaded_by, original_name, review_note, uploaded_at
"#;

const PAYMENT_COLUMNS: &str =
    "id, file_id, amount, currency, kind, description, paid_at, recorded_by";

const NOTE_COLUMNS: &str = "id, file_id, author, body, created_at";

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

/// File status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "file_status", rename_all = "snake_case")]
pub enum FileStatus {
    Reviewing,
    DocumentStage,
    ApplicationStage,
    LitigationStage,
    Approved,
    Completed,
    OnHold,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Complete,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_kind", rename_all = "snake_case")]
pub enum PaymentKind {
    Incoming,
    Outgoing,
}

/// Database row for a customer file
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub file_type_id: Uuid,
    pub dealer_id: Option<i64>,
    pub full_name: String,
    /// Lookup key for the duplicate pre-filter
    pub full_name_normalized: String,
    pub national_id: String,
    pub phone: String,
    pub plate: String,
    pub email: Option<String>,
    pub damage_date: Option<NaiveDate>,
    pub insurance_company: Option<String>,
    pub damage_description: Option<String>,
    pub customer_user_id: Option<i64>,
    pub status: FileStatus,
    pub document_status: DocumentStatus,
    pub locked: bool,
    pub closure_reason: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub settlement_currency: Option<String>,
    pub gross_payout: Option<Decimal>,
    pub expenses: Option<Decimal>,
    pub dealer_commission: Option<Decimal>,
    pub net_profit: Option<Decimal>,
    pub created_by: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity columns read by the duplicate pre-filter
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicantRow {
    pub id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub plate: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileTypeRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequirementRow {
    pub code: String,
    pub label: String,
    pub required: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub file_id: Uuid,
    pub type_code: String,
    pub content_ref: String,
    pub approval: ApprovalStatus,
    pub uploaded_by: i64,
    pub original_name: Option<String>,
    pub review_note: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub file_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub kind: PaymentKind,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub file_id: Uuid,
    pub author: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Lock flag and version of a file, read after a guarded write missed
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
struct LockState {
    locked: bool,
    version: i64,
}

/// Binds every column an atomic update may change, in `SET` order
fn bind_mutable<'q, O>(query: PgQueryAs<'q, O>, row: &'q FileRow) -> PgQueryAs<'q, O> {
    query
        .bind(&row.full_name)
        .bind(&row.full_name_normalized)
        .bind(&row.national_id)
        .bind(&row.phone)
        .bind(&row.plate)
        .bind(&row.email)
        .bind(row.damage_date)
        .bind(&row.insurance_company)
        .bind(&row.damage_description)
        .bind(row.customer_user_id)
        .bind(row.status)
        .bind(row.document_status)
        .bind(row.locked)
        .bind(&row.closure_reason)
        .bind(row.closed_at)
        .bind(&row.settlement_currency)
        .bind(row.gross_payout)
        .bind(row.expenses)
        .bind(row.dealer_commission)
        .bind(row.net_profit)
        .bind(row.updated_at)
}

/// Repository for customer files and their attachments
#[derive(Debug, Clone)]
pub struct CustomerFileRepository {
    pool: PgPool,
}

impl CustomerFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub async fn get(&self, id: Uuid) -> Result<FileRow, DatabaseError> {
        let sql = format!("SELECT {} FROM customer_files WHERE id = $1", FILE_COLUMNS);
        sqlx::query_as::<_, FileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(FILE, id))
    }

    /// Inserts a new file; the national ID index turns a second intake of
    /// the same person into `DuplicateEntry`
    pub async fn insert(&self, row: &FileRow) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO customer_files ({}) VALUES (\
             $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
             $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)",
            FILE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(row.id)
            .bind(row.file_type_id)
            .bind(row.dealer_id)
            .bind(&row.full_name)
            .bind(&row.full_name_normalized)
            .bind(&row.national_id)
            .bind(&row.phone)
            .bind(&row.plate)
            .bind(&row.email)
            .bind(row.damage_date)
            .bind(&row.insurance_company)
            .bind(&row.damage_description)
            .bind(row.customer_user_id)
            .bind(row.status)
            .bind(row.document_status)
            .bind(row.locked)
            .bind(&row.closure_reason)
            .bind(row.closed_at)
            .bind(&row.settlement_currency)
            .bind(row.gross_payout)
            .bind(row.expenses)
            .bind(row.dealer_commission)
            .bind(row.net_profit)
            .bind(row.created_by)
            .bind(row.version)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&self.pool)
            .await?;
        debug!(file_id = %row.id, "customer file row inserted");
        Ok(())
    }

    /// Writes `next` over the stored row if it is unlocked and still at
    /// `expected_version`; the version is bumped by the database
    pub async fn compare_and_set(
        &self,
        next: &FileRow,
        expected_version: i64,
    ) -> Result<FileRow, DatabaseError> {
        let sql = format!(
            "UPDATE customer_files SET \
                full_name = $3, full_name_normalized = $4, national_id = $5, \
                phone = $6, plate = $7, email = $8, damage_date = $9, \
                insurance_company = $10, damage_description = $11, customer_user_id = $12, \
                status = $13, document_status = $14, locked = $15, \
                closure_reason = $16, closed_at = $17, settlement_currency = $18, \
                gross_payout = $19, expenses = $20, dealer_commission = $21, net_profit = $22, \
                updated_at = $23, version = version + 1 \
             WHERE id = $1 AND version = $2 AND NOT locked \
             RETURNING {}",
            FILE_COLUMNS
        );

        let query = sqlx::query_as::<_, FileRow>(&sql)
            .bind(next.id)
            .bind(expected_version);
        let updated = bind_mutable(query, next).fetch_optional(&self.pool).await?;

        match updated {
            Some(row) => Ok(row),
            None => Err(self.explain_miss(next.id, Some(expected_version)).await),
        }
    }

    /// Deletes an unlocked file; attachments go with it
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM customer_files WHERE id = $1 AND NOT locked")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, None).await);
        }
        Ok(())
    }

    /// Works out why a guarded statement touched no row
    ///
    /// Locked wins over a version mismatch.
    pub async fn explain_miss(&self, id: Uuid, expected_version: Option<i64>) -> DatabaseError {
        let state = sqlx::query_as::<_, LockState>(
            "SELECT locked, version FROM customer_files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match state {
            Err(e) => e.into(),
            Ok(None) => DatabaseError::not_found(FILE, id),
            Ok(Some(state)) if state.locked => DatabaseError::Locked {
                entity: FILE,
                id: id.to_string(),
            },
            Ok(Some(state)) => match expected_version {
                Some(expected) if expected != state.version => DatabaseError::StaleVersion {
                    entity: FILE,
                    id: id.to_string(),
                    expected,
                },
                _ => DatabaseError::QueryFailed(format!("guarded write on {} {} matched no row", FILE, id)),
            },
        }
    }

    async fn ensure_exists(&self, id: Uuid) -> Result<(), DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customer_files WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(DatabaseError::not_found(FILE, id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Duplicate pre-filter
    // ------------------------------------------------------------------

    /// Files whose canonical national ID, plate or normalized name equals
    /// the given keys; blank keys are ignored
    pub async fn find_loose(
        &self,
        national_id: &str,
        plate: &str,
        name: &str,
    ) -> Result<Vec<ApplicantRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ApplicantRow>(
            r#"
            SELECT id, full_name, national_id, phone, plate
            FROM customer_files
            WHERE ($1 <> '' AND national_id = $1)
               OR ($2 <> '' AND plate = $2)
               OR ($3 <> '' AND full_name_normalized = $3)
            "#,
        )
        .bind(national_id)
        .bind(plate)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn find_by_phone_prefix(&self, prefix: &str) -> Result<Vec<ApplicantRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ApplicantRow>(
            r#"
            SELECT id, full_name, national_id, phone, plate
            FROM customer_files
            WHERE phone LIKE $1 || '%'
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ------------------------------------------------------------------
    // File types
    // ------------------------------------------------------------------

    /// A file type with its requirements in template order
    pub async fn get_file_type(&self, id: Uuid) -> Result<(FileTypeRow, Vec<RequirementRow>), DatabaseError> {
        let file_type = sqlx::query_as::<_, FileTypeRow>("SELECT id, name FROM file_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("FileType", id))?;

        let requirements = sqlx::query_as::<_, RequirementRow>(
            r#"
            SELECT code, label, required
            FROM file_type_requirements
            WHERE file_type_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok((file_type, requirements))
    }

    /// Stores a file type template in one transaction
    pub async fn insert_file_type(
        &self,
        file_type: &FileTypeRow,
        requirements: &[RequirementRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO file_types (id, name) VALUES ($1, $2)")
            .bind(file_type.id)
            .bind(&file_type.name)
            .execute(&mut *tx)
            .await?;

        for (position, requirement) in requirements.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO file_type_requirements (file_type_id, position, code, label, required)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(file_type.id)
            .bind(position as i32)
            .bind(&requirement.code)
            .bind(&requirement.label)
            .bind(requirement.required)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    pub async fn get_document(&self, id: Uuid) -> Result<DocumentRow, DatabaseError> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Document", id))
    }

    pub async fn list_documents(&self, file_id: Uuid) -> Result<Vec<DocumentRow>, DatabaseError> {
        self.ensure_exists(file_id).await?;
        let sql = format!(
            "SELECT {} FROM documents WHERE file_id = $1 ORDER BY uploaded_at, id",
            DOCUMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(file_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Inserts a document only while its file is unlocked
    pub async fn insert_document(&self, row: &DocumentRow) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO documents ({}) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9 \
             FROM customer_files WHERE id = $2 AND NOT locked",
            DOCUMENT_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(row.id)
            .bind(row.file_id)
            .bind(&row.type_code)
            .bind(&row.content_ref)
            .bind(row.approval)
            .bind(row.uploaded_by)
            .bind(&row.original_name)
            .bind(&row.review_note)
            .bind(row.uploaded_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(row.file_id, None).await);
        }
        Ok(())
    }

    /// Sets a document's approval unless its file is locked
    pub async fn review_document(
        &self,
        id: Uuid,
        approval: ApprovalStatus,
        review_note: Option<&str>,
    ) -> Result<DocumentRow, DatabaseError> {
        let sql = format!(
            "UPDATE documents d SET approval = $2, review_note = $3 \
             FROM customer_files f \
             WHERE d.id = $1 AND f.id = d.file_id AND NOT f.locked \
             RETURNING {}",
            DOCUMENT_COLUMNS
                .split(',')
                .map(|c| format!("d.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let updated = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(approval)
            .bind(review_note)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                let document = self.get_document(id).await?;
                Err(self.explain_miss(document.file_id, None).await)
            }
        }
    }

    // ------------------------------------------------------------------
    // Payments and notes
    // ------------------------------------------------------------------

    /// Inserts a payment only while its file is unlocked
    pub async fn insert_payment(&self, row: &PaymentRow) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO payments ({}) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8 \
             FROM customer_files WHERE id = $2 AND NOT locked",
            PAYMENT_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(row.id)
            .bind(row.file_id)
            .bind(row.amount)
            .bind(&row.currency)
            .bind(row.kind)
            .bind(&row.description)
            .bind(row.paid_at)
            .bind(row.recorded_by)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(row.file_id, None).await);
        }
        Ok(())
    }

    pub async fn list_payments(&self, file_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        self.ensure_exists(file_id).await?;
        let sql = format!(
            "SELECT {} FROM payments WHERE file_id = $1 ORDER BY paid_at, id",
            PAYMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(file_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Appends a note; locked files accept notes
    pub async fn insert_note(&self, row: &NoteRow) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO notes ({}) \
             SELECT $1, $2, $3, $4, $5 FROM customer_files WHERE id = $2",
            NOTE_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(row.id)
            .bind(row.file_id)
            .bind(row.author)
            .bind(&row.body)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(FILE, row.file_id));
        }
        Ok(())
    }

    pub async fn list_notes(&self, file_id: Uuid) -> Result<Vec<NoteRow>, DatabaseError> {
        self.ensure_exists(file_id).await?;
        let sql = format!(
            "SELECT {} FROM notes WHERE file_id = $1 ORDER BY created_at, id",
            NOTE_COLUMNS
        );
        Ok(sqlx::query_as::<_, NoteRow>(&sql)
            .bind(file_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
