//! Audit domain errors

use thiserror::Error;

use core_kernel::{PortError, Role};

/// Errors from audit operations
///
/// Recording never fails towards the caller; only the retention purge
/// returns these.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The actor's role may not perform the operation
    #[error("Role {role} may not {operation}")]
    Forbidden { role: Role, operation: String },

    /// The audit store failed
    #[error("Audit store error: {0}")]
    Store(#[from] PortError),
}

impl AuditError {
    /// Creates a Forbidden error
    pub fn forbidden(role: Role, operation: impl Into<String>) -> Self {
        AuditError::Forbidden {
            role,
            operation: operation.into(),
        }
    }
}
