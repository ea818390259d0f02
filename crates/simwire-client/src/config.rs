//! Client configuration
//!
//! Configuration is resolved in the following order (later overrides
//! earlier):
//! 1. Built-in defaults
//! 2. TOML file named by the `SIMWIRE_CONFIG` environment variable
//! 3. Environment variables (`SIMWIRE_HOST`, `SIMWIRE_CONNECT_TIMEOUT_MS`,
//!    `SIMWIRE_EVENT_CAPACITY`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a TOML configuration file
pub const ENV_CONFIG_FILE: &str = "SIMWIRE_CONFIG";
/// Environment variable overriding the default host
pub const ENV_HOST: &str = "SIMWIRE_HOST";
/// Environment variable overriding the connect retry window
pub const ENV_CONNECT_TIMEOUT_MS: &str = "SIMWIRE_CONNECT_TIMEOUT_MS";
/// Environment variable overriding the connection event stream capacity
pub const ENV_EVENT_CAPACITY: &str = "SIMWIRE_EVENT_CAPACITY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value for environment variable '{var}': {reason}")]
    InvalidEnv { var: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Host used when a connect call does not name one
    pub default_host: String,

    /// How long connect keeps retrying the host lookup before failing.
    /// Zero means a single immediate attempt.
    pub connect_timeout_ms: u64,

    /// Capacity of the connection event stream
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            default_host: "local".to_string(),
            connect_timeout_ms: 0,
            event_capacity: 32,
        }
    }
}

impl ClientConfig {
    /// Resolve the effective configuration: defaults, then the file
    /// named by `SIMWIRE_CONFIG` (if set), then environment overrides.
    pub fn load() -> ConfigResult<Self> {
        let mut config = match std::env::var(ENV_CONFIG_FILE) {
            Ok(path) if !path.is_empty() => Self::load_from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `SIMWIRE_*` environment overrides to this configuration
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(host) = std::env::var(ENV_HOST) {
            if !host.is_empty() {
                self.default_host = host;
            }
        }
        if let Ok(timeout) = std::env::var(ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout_ms =
                timeout
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: ENV_CONNECT_TIMEOUT_MS.to_string(),
                        reason: format!("'{timeout}' is not a non-negative integer"),
                    })?;
        }
        if let Ok(capacity) = std::env::var(ENV_EVENT_CAPACITY) {
            self.event_capacity =
                capacity
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: ENV_EVENT_CAPACITY.to_string(),
                        reason: format!("'{capacity}' is not a non-negative integer"),
                    })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_host".to_string(),
                reason: "host cannot be empty".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity".to_string(),
                reason: "capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.default_host, "local");
        assert_eq!(config.connect_timeout_ms, 0);
        assert_eq!(config.event_capacity, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ClientConfig = toml::from_str("default_host = \"sim-rig\"").unwrap();
        assert_eq!(config.default_host, "sim-rig");
        assert_eq!(config.event_capacity, 32);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed = toml::from_str::<ClientConfig>("poll_rate = 10");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation_rejects_empty_host() {
        let config = ClientConfig {
            default_host: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "default_host"
        ));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = ClientConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_host = \"bench\"").unwrap();
        writeln!(file, "connect_timeout_ms = 250").unwrap();

        let config = ClientConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.default_host, "bench");
        assert_eq!(config.connect_timeout_ms, 250);
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ClientConfig::load_from_file(Path::new("/nonexistent/simwire.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_host = [").unwrap();

        let result = ClientConfig::load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }
}
