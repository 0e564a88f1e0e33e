//! Chirp Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use chirp_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 8080").unwrap();
//! assert_eq!(config.server.port, 8080);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 4000
//! max_subscribers = 1000
//! heartbeat_interval_secs = 30
//!
//! [upstream]
//! url = "https://tweet-service.herokuapp.com/stream"
//! reconnect_initial_ms = 500
//! reconnect_max_ms = 30000
//! connect_timeout_secs = 10
//! read_timeout_secs = 90
//!
//! [delivery]
//! cooldown_ms = 50
//! ```

mod delivery;
mod error;
mod logging;
mod server;
mod upstream;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use delivery::DeliveryConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use server::ServerConfig;
pub use upstream::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_UPSTREAM_URL, UpstreamConfig};

use serde::Deserialize;

/// Environment variable that overrides `[server] port`
pub const PORT_ENV: &str = "PORT";

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Subscriber-facing server
    pub server: ServerConfig,

    /// Upstream event source
    pub upstream: UpstreamConfig,

    /// Per-subscriber delivery throttling
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let port = std::env::var(PORT_ENV).ok();
        self.apply_port_override(port.as_deref())?;
        Ok(self)
    }

    /// Override the listen port from a `PORT`-style value
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<()> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        self.server.port = value.parse().map_err(|_| {
            ConfigError::invalid_value("server", "port", format!("{PORT_ENV}='{value}' is not a port"))
        })?;
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.delivery.cooldown_ms, 50);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[server]
host = "127.0.0.1"
port = 9000
max_subscribers = 10
heartbeat_interval_secs = 5

[upstream]
url = "http://localhost:8081/stream"
max_retries = 3

[delivery]
cooldown_ms = 100
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.server.max_subscribers, 10);
        assert_eq!(config.upstream.max_retries, Some(3));
        assert_eq!(config.delivery.cooldown().as_millis(), 100);
    }

    #[test]
    fn test_shipped_example_config() {
        let config = Config::from_str(include_str!("../../../configs/config.toml")).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.upstream.max_retries, None);
        assert_eq!(config.delivery.cooldown_ms, 50);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        assert!(Config::from_str("[server]\nworkers = 4").is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4321").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4321);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }

    #[test]
    fn test_port_override() {
        let mut config = Config::default();

        config.apply_port_override(Some("8088")).unwrap();
        assert_eq!(config.server.port, 8088);

        config.apply_port_override(None).unwrap();
        config.apply_port_override(Some("  ")).unwrap();
        assert_eq!(config.server.port, 8088);

        let err = config.apply_port_override(Some("eighty")).unwrap_err();
        assert!(err.to_string().contains("eighty"));
    }
}
