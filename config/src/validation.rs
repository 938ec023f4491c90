//! # Configuration Validation
//!
//! Validation rules for all configuration structures, enforced through the
//! `validator` derive.
//!
//! ## Validation Rules
//! ### General
//! - `environment`: must be "local", "dev" or "prod"
//!
//! ### Store
//! - `backend`: must be "postgres" or "memory"
//! - `postgres.port`: 1-65535, `pool_size`: 1-100, `timeout_seconds`: 1-300
//!
//! ### Broker
//! - `addresses`: at least one
//! - `partitions`: 1-64, `replication_factor`: 1-5
//! - `retry`: every step at least 1 ms, `initial_delay_ms` below `max_delay_ms`
//!
//! ### Publisher
//! - `source`: must be "local" or "remote"
//! - `due_window_seconds`: at most one week, 0 selects every note
//! - `cycle_interval_seconds`: 1-86400
//! - `shutdown_timeout_seconds`: 1-300
//!
//! ### Notes service
//! - `base_url`: a valid URL
//!
//! ### Observability
//! - `logging_level`: when set, "trace", "debug", "info", "warn" or "error"

use crate::config::Config;
use validator::Validate;

pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_invalid_environment() {
        let mut config = Config::default();
        config.environment = "staging".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_store_backend() {
        let mut config = Config::default();
        config.store.backend = "sqlite".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_nested_postgres_port() {
        let mut config = Config::default();
        config.store.postgres.port = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_broker_needs_an_address() {
        let mut config = Config::default();
        config.broker.addresses.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_broker_partitions_range() {
        let mut config = Config::default();
        config.broker.partitions = 0;
        assert!(validate(&config).is_err());

        config.broker.partitions = 65;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_retry_increment() {
        let mut config = Config::default();
        config.broker.retry.increment_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_retry_initial_delay_below_ceiling() {
        let mut config = Config::default();
        config.broker.retry.initial_delay_ms = 20_000;
        config.broker.retry.max_delay_ms = 20_000;
        assert!(validate(&config).is_err());

        config.broker.retry.initial_delay_ms = 30_000;
        assert!(validate(&config).is_err());

        config.broker.retry.initial_delay_ms = 19_999;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_due_window_selects_all() {
        let mut config = Config::default();
        config.publisher.due_window_seconds = 0;
        assert!(validate(&config).is_ok());
        assert!(config.publisher.due_window().is_all());
    }

    #[test]
    fn test_validate_publisher_source() {
        let mut config = Config::default();
        config.publisher.source = "grpc".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_notes_service_url() {
        let mut config = Config::default();
        config.notes_service.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_logging_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = Config::default();
            config.observability.logging_level = Some(level.to_string());
            assert!(validate(&config).is_ok());
        }

        let mut config = Config::default();
        config.observability.logging_level = Some("verbose".to_string());
        assert!(validate(&config).is_err());
    }
}
