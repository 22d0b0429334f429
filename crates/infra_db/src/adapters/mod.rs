//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter:
//! - implements the port trait plus `DomainPort` and `HealthCheckable`
//! - translates between domain models and repository row types
//! - converts `DatabaseError` into `PortError`
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimsStore;
//! use domain_claims::LifecycleService;
//!
//! let store = Arc::new(PostgresClaimsStore::new(pool.clone()));
//! let service = LifecycleService::new(store, Arc::new(recorder));
//! ```

pub mod claims;
pub mod audit;

pub use claims::PostgresClaimsStore;
pub use audit::{PostgresAuditStore, PostgresNotificationStore, PostgresUserDirectory};

use chrono::Utc;
use core_kernel::{AdapterHealth, HealthCheckResult};
use sqlx::PgPool;

/// Runs `SELECT 1` against the pool and reports the outcome
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}
