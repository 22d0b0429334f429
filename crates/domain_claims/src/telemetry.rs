//! Tracing subscriber setup for binaries and tests embedding the engine

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EngineConfig;

fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber
///
/// `RUST_LOG` wins over `log_level`. Calling this twice is harmless; the
/// second call leaves the first subscriber in place.
pub fn init_tracing(log_level: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(filter(log_level));

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(log_level, json, "tracing initialized");
    }
}

/// Installs the subscriber described by the configuration
pub fn init_from_config(config: &EngineConfig) {
    init_tracing(&config.log_level, config.log_json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_falls_back_to_info() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter("not a [valid directive").to_string(), "info");
        assert_eq!(filter("domain_claims=debug").to_string(), "domain_claims=debug");
    }

    #[test]
    fn test_repeated_init_keeps_first_subscriber() {
        let config = EngineConfig {
            log_level: "warn".to_string(),
            ..EngineConfig::default()
        };
        init_from_config(&config);
        init_tracing("debug", true);
        tracing::warn!("still logging after second init");
    }
}
