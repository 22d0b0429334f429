//! Ports and Adapters Infrastructure
//!
//! The engine talks to its storage and identity collaborators through port
//! traits defined in each domain crate. This module holds the pieces every
//! port shares: the unified [`PortError`], the [`DomainPort`] marker and the
//! health-check contract.
//!
//! ```text
//!            LifecycleService / AuditRecorder
//!                          │
//!                          ▼
//!      ClaimsStore, AuditStore, NotificationStore, UserDirectory
//!                    ▲                        ▲
//!          ┌─────────┴─────────┐    ┌─────────┴─────────┐
//!          │  PostgreSQL       │    │  In-memory (mock) │
//!          │  (infra_db)       │    │                   │
//!          └───────────────────┘    └───────────────────┘
//! ```

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Error type for port operations
///
/// Adapters translate their native failures into these variants so the
/// domain layer can react the same way whichever adapter is wired in.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// A uniqueness constraint rejected the write
    #[error("Duplicate {field}: {value}")]
    Duplicate {
        field: String,
        value: String,
    },

    /// The target row is locked and refuses the mutation
    #[error("{entity_type} {id} is locked")]
    Locked {
        entity_type: String,
        id: String,
    },

    /// A compare-and-set write found a different version than expected
    #[error("{entity_type} {id} was modified concurrently (expected version {expected})")]
    StaleVersion {
        entity_type: String,
        id: String,
        expected: i64,
    },

    /// The operation conflicts with existing data
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Duplicate error for a unique field
    pub fn duplicate(field: impl Into<String>, value: impl fmt::Display) -> Self {
        PortError::Duplicate {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Creates a Locked error
    pub fn locked(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::Locked {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a StaleVersion error
    pub fn stale(entity_type: impl Into<String>, id: impl fmt::Display, expected: i64) -> Self {
        PortError::StaleVersion {
            entity_type: entity_type.into(),
            id: id.to_string(),
            expected,
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. } | PortError::Timeout { .. }
        )
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// All port traits extend this marker so they can be shared across tasks.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    /// A healthy result with zero latency, used by in-memory adapters
    pub fn healthy(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    async fn health_check(&self) -> HealthCheckResult;
}
