//! # Configuration File Loading
//!
//! Loads configuration from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::Config;
use std::path::Path;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

fn read_config_file(path: &Path) -> Result<String, ConfigFileError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigFileError::FileNotFound(path.display().to_string()),
        _ => ConfigFileError::Io(e),
    })
}

/// Load configuration from a TOML file.
///
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_toml(Path::new("config/local.toml"))?;
///     println!("Broker topic: {}", config.broker.topic);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = read_config_file(path)?;
    toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
}

/// Load configuration from a YAML file, the format the deployment profiles
/// ship in.
pub fn load_from_yaml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = read_config_file(path)?;
    // An empty profile file means "all defaults".
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
}

/// Load configuration from file, detecting the format from the extension.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`: YAML format
/// - `.yml`: YAML format
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_file;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_file(Path::new("config/prod.yaml"))?;
///     println!("Cycle every {}s", config.publisher.cycle_interval_seconds);
///     Ok(())
/// }
/// ```
///
/// ## Error Handling
/// Returns `ConfigFileError` for:
/// - File not found
/// - Invalid file extension
/// - Parse errors for detected format
pub fn load_from_file(path: &Path) -> Result<Config, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string())),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_yaml_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dev.yaml");
        fs::write(
            &path,
            r#"
environment: dev
store:
  backend: postgres
  postgres:
    host: db.internal
    database: reminders
broker:
  addresses:
    - redis://broker-1:6379
    - redis://broker-2:6379
  topic: notes
  partitions: 3
  replication_factor: 2
  group: bots
publisher:
  source: remote
  cycle_interval_seconds: 60
notes_service:
  base_url: http://notes:8080
"#,
        )
        .unwrap();

        let config = load_from_yaml(&path).unwrap();
        assert_eq!(config.environment, "dev");
        assert_eq!(config.store.postgres.host, "db.internal");
        assert_eq!(config.store.postgres.port, 5432);
        assert_eq!(config.broker.addresses.len(), 2);
        assert_eq!(config.broker.partitions, 3);
        assert_eq!(config.broker.replication_factor, 2);
        assert_eq!(config.broker.consumer, "notes-publisher");
        assert_eq!(config.publisher.source, "remote");
        assert_eq!(config.publisher.cycle_interval_seconds, 60);
        assert_eq!(config.publisher.due_window_seconds, 300);
        assert_eq!(config.notes_service.base_url, "http://notes:8080");
    }

    #[test]
    fn test_load_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.toml");
        fs::write(
            &path,
            r#"
environment = "local"

[store]
backend = "memory"

[broker.retry]
initial_delay_ms = 10
increment_ms = 10
max_delay_ms = 50

[publisher]
allow_overlap = false

[observability]
logging_level = "trace"
"#,
        )
        .unwrap();

        let config = load_from_toml(&path).unwrap();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.broker.retry.initial_delay_ms, 10);
        assert!(!config.publisher.allow_overlap);
        assert_eq!(config.logging_level(), "trace");
    }

    #[test]
    fn test_empty_yaml_is_all_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(load_from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_file_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let result = load_from_file(&path);
        assert!(matches!(result, Err(ConfigFileError::UnsupportedFormat(ref ext)) if ext == "json"));
    }

    #[test]
    fn test_load_from_file_no_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "").unwrap();

        assert!(matches!(load_from_file(&path), Err(ConfigFileError::NoExtension)));
    }

    #[test]
    fn test_invalid_syntax() {
        let dir = TempDir::new().unwrap();
        let toml_path = dir.path().join("broken.toml");
        let yaml_path = dir.path().join("broken.yaml");
        fs::write(&toml_path, "[broker\n").unwrap();
        fs::write(&yaml_path, "broker: [unmatched\n").unwrap();

        assert!(matches!(load_from_file(&toml_path), Err(ConfigFileError::TomlParse(_))));
        assert!(matches!(load_from_file(&yaml_path), Err(ConfigFileError::YamlParse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_from_file(Path::new("/nonexistent/config/local.yaml"));
        assert!(matches!(result, Err(ConfigFileError::FileNotFound(_))));
    }
}
