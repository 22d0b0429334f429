//! Database Test Utilities
//!
//! A throwaway PostgreSQL container with the engine's migrations applied,
//! for the `infra_db` adapter tests. Those tests are `#[ignore]`d because
//! they need Docker; run them with `cargo test -- --ignored`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

use domain_claims::FileType;
use infra_db::{PostgresClaimsStore, PostgresUserDirectory};

use crate::fixtures::{FileTypeFixtures, OFFICE_DIRECTORY};

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "claims_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection settings of a test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL container; stopped when dropped
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies the migrations
    pub async fn new() -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts the fixture office directory and the motor damage file type
    pub async fn seed_office(&self) -> Result<FileType, BoxError> {
        let directory = PostgresUserDirectory::new(self.pool.clone());
        for user in OFFICE_DIRECTORY.iter() {
            directory.insert(user).await?;
        }

        let file_type = FileTypeFixtures::motor_damage();
        PostgresClaimsStore::new(self.pool.clone())
            .insert_file_type(&file_type)
            .await?;
        Ok(file_type)
    }

    /// Empties every table, keeping the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        sqlx::query(
            "TRUNCATE TABLE notifications, audit_events, notes, payments, documents, \
             customer_files, file_type_requirements, file_types, users CASCADE",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Declares a Docker-backed test that receives a fresh, seeded database
///
/// ```rust,ignore
/// db_test!(stores_a_file, |db, file_type| {
///     let store = PostgresClaimsStore::new(db.pool().clone());
///     // ...
/// });
/// ```
#[macro_export]
macro_rules! db_test {
    ($name:ident, |$db:ident, $file_type:ident| $body:block) => {
        #[tokio::test]
        #[ignore = "needs Docker"]
        async fn $name() {
            let $db = $crate::database::TestDatabase::new()
                .await
                .expect("Failed to start test database");
            let $file_type = $db.seed_office().await.expect("Failed to seed test database");
            $body
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_connection_url() {
        let url = TestDatabaseConfig::default().connection_url();

        assert!(url.starts_with("postgres://test_user:"));
        assert!(url.ends_with("/claims_test"));
    }
}
