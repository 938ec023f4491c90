//! # Environment Variable Loader
//!
//! Applies environment variable overrides on top of a loaded configuration,
//! following 12-factor app principles.
//!
//! # Naming Convention
//! - `NOTES_ENV`: Deployment profile (local/dev/prod)
//! - `NOTES_STORE_*`, `NOTES_PG_*`: Note store settings
//! - `NOTES_BROKER_*`: Broker settings
//! - `NOTES_PUBLISHER_*`: Publisher and loop settings
//! - `NOTES_SERVICE_*`: Remote notes service
//! - `NOTES_LOG_LEVEL`: Log level override
//!
//! `POSTGRES_PASSWORD` is honoured as a fallback for `NOTES_PG_PASSWORD`.

use crate::config::Config;
use crate::file_loader::{ConfigFileError, load_from_file};
use std::env;
use std::path::Path;
use validator::Validate;

/// Environment override error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigEnvError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Any failure while assembling the effective configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error(transparent)]
    Env(#[from] ConfigEnvError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Overrides fields of `config` from `NOTES_*` environment variables.
///
/// Unset variables leave the field untouched; a set but unparsable variable
/// is an error rather than a silent fallback.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigEnvError> {
    override_string("NOTES_ENV", &mut config.environment);

    override_string("NOTES_STORE_BACKEND", &mut config.store.backend);
    let pg = &mut config.store.postgres;
    override_string("NOTES_PG_HOST", &mut pg.host);
    override_parsed("NOTES_PG_PORT", &mut pg.port)?;
    override_string("NOTES_PG_DATABASE", &mut pg.database);
    override_string("NOTES_PG_USERNAME", &mut pg.username);
    override_string("POSTGRES_PASSWORD", &mut pg.password);
    override_string("NOTES_PG_PASSWORD", &mut pg.password);
    override_parsed("NOTES_PG_POOL_SIZE", &mut pg.pool_size)?;

    let broker = &mut config.broker;
    if let Some(addresses) = non_empty_var("NOTES_BROKER_ADDRESSES") {
        broker.addresses = addresses
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    override_string("NOTES_BROKER_TOPIC", &mut broker.topic);
    override_parsed("NOTES_BROKER_PARTITIONS", &mut broker.partitions)?;
    override_parsed("NOTES_BROKER_REPLICATION", &mut broker.replication_factor)?;
    override_string("NOTES_BROKER_GROUP", &mut broker.group);
    override_string("NOTES_BROKER_CONSUMER", &mut broker.consumer);
    override_parsed("NOTES_BROKER_SEND_TIMEOUT_MS", &mut broker.send_timeout_ms)?;

    let publisher = &mut config.publisher;
    override_string("NOTES_PUBLISHER_SOURCE", &mut publisher.source);
    override_parsed("NOTES_PUBLISHER_DUE_WINDOW_SECONDS", &mut publisher.due_window_seconds)?;
    override_parsed(
        "NOTES_PUBLISHER_CYCLE_INTERVAL_SECONDS",
        &mut publisher.cycle_interval_seconds,
    )?;
    override_parsed(
        "NOTES_PUBLISHER_SHUTDOWN_TIMEOUT_SECONDS",
        &mut publisher.shutdown_timeout_seconds,
    )?;
    override_parsed("NOTES_PUBLISHER_ALLOW_OVERLAP", &mut publisher.allow_overlap)?;

    override_string("NOTES_SERVICE_URL", &mut config.notes_service.base_url);
    override_parsed("NOTES_SERVICE_TIMEOUT_SECONDS", &mut config.notes_service.timeout_seconds)?;

    if let Some(level) = non_empty_var("NOTES_LOG_LEVEL") {
        config.observability.logging_level = Some(level);
    }

    Ok(())
}

/// Defaults with environment overrides applied.
pub fn load_from_env() -> Result<Config, ConfigEnvError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// File (when given), then environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn override_string(key: &str, target: &mut String) {
    if let Some(value) = non_empty_var(key) {
        *target = value;
    }
}

fn override_parsed<T>(key: &str, target: &mut T) -> Result<(), ConfigEnvError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = non_empty_var(key) {
        *target = raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigEnvError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_overrides_file_values() {
        unsafe {
            env::set_var("NOTES_ENV", "prod");
            env::set_var("NOTES_BROKER_ADDRESSES", "redis://a:6379, redis://b:6379");
            env::set_var("NOTES_BROKER_PARTITIONS", "4");
            env::set_var("NOTES_PUBLISHER_ALLOW_OVERLAP", "false");
            env::set_var("POSTGRES_PASSWORD", "from-compose");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.environment, "prod");
        assert_eq!(
            config.broker.addresses,
            vec!["redis://a:6379".to_string(), "redis://b:6379".to_string()]
        );
        assert_eq!(config.broker.partitions, 4);
        assert!(!config.publisher.allow_overlap);
        assert_eq!(config.store.postgres.password, "from-compose");

        unsafe {
            env::remove_var("NOTES_ENV");
            env::remove_var("NOTES_BROKER_ADDRESSES");
            env::remove_var("NOTES_BROKER_PARTITIONS");
            env::remove_var("NOTES_PUBLISHER_ALLOW_OVERLAP");
            env::remove_var("POSTGRES_PASSWORD");
        }
    }

    #[test]
    #[serial]
    fn test_specific_password_wins_over_fallback() {
        unsafe {
            env::set_var("POSTGRES_PASSWORD", "fallback");
            env::set_var("NOTES_PG_PASSWORD", "specific");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.store.postgres.password, "specific");

        unsafe {
            env::remove_var("POSTGRES_PASSWORD");
            env::remove_var("NOTES_PG_PASSWORD");
        }
    }

    #[test]
    #[serial]
    fn test_unparsable_value_is_rejected() {
        unsafe {
            env::set_var("NOTES_PG_PORT", "not-a-port");
        }

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ConfigEnvError::InvalidValue { ref key, .. } if key == "NOTES_PG_PORT"));

        unsafe {
            env::remove_var("NOTES_PG_PORT");
        }
    }

    #[test]
    #[serial]
    fn test_load_config_validates_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.yaml");
        fs::write(&path, "publisher:\n  cycle_interval_seconds: 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    #[serial]
    fn test_load_config_without_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }
}
