//! Engine configuration

use serde::Deserialize;

use crate::completeness::MatchMode;

/// Engine configuration
///
/// Read from `ENGINE_`-prefixed environment variables, e.g.
/// `ENGINE_DOCUMENT_MATCH_MODE=exact`. Unset keys keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How uploaded document codes are matched against required codes
    pub document_match_mode: MatchMode,
    /// Reject national IDs that fail the checksum instead of warning
    pub strict_national_id: bool,
    /// Capacity of the audit dispatcher channel
    pub audit_channel_capacity: usize,
    /// Log level or filter directive
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// PostgreSQL connection string, when the SQL adapter is used
    pub database_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            document_match_mode: MatchMode::Loose,
            strict_national_id: false,
            audit_channel_capacity: domain_audit::dispatcher::DEFAULT_CAPACITY,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the environment, after reading `.env` if present
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(config::Environment::with_prefix("ENGINE").try_parsing(true))
    }

    /// Loads configuration from an explicit environment source
    pub fn from_source(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
