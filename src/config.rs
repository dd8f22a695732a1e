//! Server configuration.
//!
//! Values are resolved in this order, later sources winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config` or `$MAILSINK_CONFIG`)
//! 3. Environment variables and command line flags, applied by the binary

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DEFAULT_CAPACITY;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hostname announced in SMTP greetings.
    pub hostname: String,
    /// Interface both listeners bind to.
    pub bind_host: String,
    pub smtp_port: u16,
    pub http_port: u16,
    /// Maximum number of messages kept in memory.
    pub capacity: usize,
    /// Name shown on the status page and in `/health`.
    pub service_name: String,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "mailsink.local".to_string(),
            bind_host: "127.0.0.1".to_string(),
            smtp_port: 1025,
            http_port: 3000,
            capacity: DEFAULT_CAPACITY,
            service_name: "Mock Email Server".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or return the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn smtp_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.smtp_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.smtp_addr(), "127.0.0.1:1025");
        assert_eq!(config.http_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("capacity = 2\nsmtp_port = 2525\n").unwrap();
        assert_eq!(config.capacity, 2);
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.hostname, "mailsink.local");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir()
            .join(format!("mailsink-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bind_host = \"0.0.0.0\"\nservice_name = \"Test Sink\"").unwrap();
        drop(file);

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.service_name, "Test Sink");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/mailsink.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));

        let message = result.unwrap_err().to_string();
        assert!(message.contains("'/nonexistent/mailsink.toml'"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("mailsink-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "capacity = \"many\"").unwrap();

        let result = Config::load(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
