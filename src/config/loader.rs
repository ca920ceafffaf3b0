//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed ({} problems)", .0.len())]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_minimal_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:9999\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
        assert_eq!(config.principal.path, "/ZGU/");
        assert_eq!(config.contacts.len(), 1);
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[principal]\npath = \"no-slashes\"").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/carddav.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
