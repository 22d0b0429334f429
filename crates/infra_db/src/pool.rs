//! Connection pool and schema migrations

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use domain_claims::EngineConfig;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

const DEFAULT_URL: &str = "postgres://localhost/claims";

/// Pool settings
///
/// The engine issues short single-statement writes, so a small pool with a
/// short acquire timeout is enough; a timed-out acquire surfaces as
/// [`DatabaseError::PoolExhausted`].
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/claims")
///     .max_connections(4)
///     .acquire_timeout(Duration::from_secs(2));
/// assert_eq!(config.max_connections, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }

    /// Settings for the URL in `ENGINE_DATABASE_URL`, or the local default
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self::new(config.database_url.as_deref().unwrap_or(DEFAULT_URL))
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

/// Opens a pool; fails fast if the first connection cannot be made
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(max_connections = config.max_connections, "connecting to claims database");

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

pub async fn create_pool_from_url(url: &str) -> Result<DatabasePool, DatabaseError> {
    create_pool(DatabaseConfig::new(url)).await
}

/// Applies the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_url_wins_over_default() {
        let engine = EngineConfig {
            database_url: Some("postgres://db.internal/claims_prod".to_string()),
            ..EngineConfig::default()
        };
        assert_eq!(DatabaseConfig::from_engine(&engine).url, "postgres://db.internal/claims_prod");
        assert_eq!(DatabaseConfig::from_engine(&EngineConfig::default()).url, DEFAULT_URL);
    }

    #[test]
    fn test_builder_overrides() {
        let config = DatabaseConfig::default()
            .max_connections(3)
            .min_connections(0)
            .acquire_timeout(Duration::from_millis(500));

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout, Duration::from_millis(500));
    }
}
