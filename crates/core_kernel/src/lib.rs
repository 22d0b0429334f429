//! Core Kernel - Foundational types for the claim file engine
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Actors, roles and the capability table
//! - Port error and health-check contracts for storage adapters

pub mod money;
pub mod identifiers;
pub mod access;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    CustomerFileId, DocumentId, FileTypeId, PaymentId, NoteId,
    AuditEventId, NotificationId, UserId, DealerId,
};
pub use access::{Actor, Role, Capability, capabilities_for};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
