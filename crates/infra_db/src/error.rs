//! Database error types
//!
//! Repositories return [`DatabaseError`]; adapters hand it to the domain as a
//! [`PortError`] through the `From` impl at the bottom of this module.

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation
    #[error("Duplicate entry violates {constraint}: {message}")]
    DuplicateEntry { constraint: String, message: String },

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A guarded write hit a locked customer file
    #[error("{entity} {id} is locked")]
    Locked { entity: &'static str, id: String },

    /// A compare-and-set write found another version
    #[error("{entity} {id} is no longer at version {expected}")]
    StaleVersion {
        entity: &'static str,
        id: String,
        expected: i64,
    },

    /// Transaction error
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain value
    #[error("Cannot decode {column}: {message}")]
    Decode { column: &'static str, message: String },

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn decode(column: &'static str, message: impl std::fmt::Display) -> Self {
        DatabaseError::Decode {
            column,
            message: message.to_string(),
        }
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry { .. }
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors by PostgreSQL error code
///
/// https://www.postgresql.org/docs/current/errcodes-appendix.html
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "Record",
                id: "?".to_string(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Migrate(e) => DatabaseError::MigrationFailed(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => DatabaseError::Decode {
                column: "column",
                message: format!("{}: {}", index, source),
            },
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry {
                        constraint: db_err.constraint().unwrap_or("unique constraint").to_string(),
                        message,
                    },
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("40001") | Some("40P01") => DatabaseError::TransactionFailed(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            other => DatabaseError::QueryFailed(other.to_string()),
        }
    }
}

/// Unique indexes whose violation means "same applicant already on file"
fn duplicate_field(constraint: &str) -> &'static str {
    if constraint.contains("national_id") {
        "national_id"
    } else {
        "unique_key"
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
            DatabaseError::Locked { entity, id } => PortError::locked(entity, id),
            DatabaseError::StaleVersion { entity, id, expected } => {
                PortError::stale(entity, id, expected)
            }
            DatabaseError::DuplicateEntry { constraint, message } => {
                PortError::duplicate(duplicate_field(&constraint), message)
            }
            DatabaseError::ForeignKeyViolation(message) => PortError::Conflict { message },
            DatabaseError::ConstraintViolation(message) => PortError::validation(message),
            DatabaseError::ConnectionFailed(message) => PortError::connection(message),
            DatabaseError::PoolExhausted => PortError::Timeout {
                operation: "acquire connection".to_string(),
                duration_ms: 0,
            },
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_port_not_found() {
        let port: PortError = DatabaseError::not_found("CustomerFile", "CF-1").into();
        assert!(port.is_not_found());
        assert!(port.to_string().contains("CF-1"));
    }

    #[test]
    fn test_national_id_index_maps_to_duplicate_field() {
        let port: PortError = DatabaseError::DuplicateEntry {
            constraint: "uq_customer_files_national_id_normalized".to_string(),
            message: "duplicate key value".to_string(),
        }
        .into();
        assert!(matches!(port, PortError::Duplicate { ref field, .. } if field == "national_id"));
    }

    #[test]
    fn test_lock_and_version_errors_survive_translation() {
        let locked: PortError = DatabaseError::Locked {
            entity: "CustomerFile",
            id: "CF-1".to_string(),
        }
        .into();
        assert!(matches!(locked, PortError::Locked { .. }));

        let stale: PortError = DatabaseError::StaleVersion {
            entity: "CustomerFile",
            id: "CF-1".to_string(),
            expected: 3,
        }
        .into();
        assert!(matches!(stale, PortError::StaleVersion { expected: 3, .. }));
    }

    #[test]
    fn test_pool_exhaustion_is_transient() {
        let port: PortError = DatabaseError::PoolExhausted.into();
        assert!(port.is_transient());
    }
}
