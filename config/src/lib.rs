//! # Configuration System
//!
//! Centralized configuration management for the reminder notes system.
//!
//! This crate provides:
//! - Configuration structures for the store, broker, publisher and logging
//! - Configuration file loading (TOML/YAML)
//! - Environment variable overrides (12-factor app principles)
//! - Configuration validation
//!
//! Precedence is environment over file over defaults.

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod validation;

pub use config::{
    BrokerConfig, Config, NotesServiceConfig, ObservabilityConfig, PostgresConfig,
    PublisherConfig, RetryConfig, StoreConfig,
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{ConfigEnvError, ConfigError, apply_env_overrides, load_config, load_from_env};
pub use validation::validate;
pub use validator::Validate;
