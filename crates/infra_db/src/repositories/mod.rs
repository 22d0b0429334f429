//! Repository implementations
//!
//! Repositories own the SQL and the row types; they know nothing about the
//! domain types, which the adapters in [`crate::adapters`] translate to and
//! from. Queries are built at runtime with `sqlx::query_as::<_, Row>` so the
//! crate compiles without a live database.

pub mod customer_file;
pub mod audit;

pub use customer_file::CustomerFileRepository;
pub use audit::{AuditRepository, NotificationRepository, UserRepository};
