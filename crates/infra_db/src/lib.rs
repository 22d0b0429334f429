//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the ports defined by `domain_claims` and
//! `domain_audit`, built on SQLx.
//!
//! # Layout
//!
//! - [`pool`]: connection pool configuration and migrations
//! - [`repositories`]: SQL and row types, no domain knowledge
//! - [`adapters`]: port implementations translating rows to domain values
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimsStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresClaimsStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{
    PostgresAuditStore, PostgresClaimsStore, PostgresNotificationStore, PostgresUserDirectory,
};
