//! Configuration validation
//!
//! Checks values that parse but cannot work:
//! - Server host is present and at least one subscriber is allowed
//! - Upstream URL is an http(s) URL
//! - Reconnect delays are positive and ordered
//! - Timeouts are positive

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_upstream(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.host.trim().is_empty() {
        return Err(ConfigError::missing_field("server", "host"));
    }

    if server.max_subscribers == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "max_subscribers",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_upstream(config: &Config) -> Result<()> {
    let upstream = &config.upstream;

    let url = upstream.url.trim();
    if url.is_empty() {
        return Err(ConfigError::missing_field("upstream", "url"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            "upstream",
            "url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }

    if upstream.reconnect_initial_ms == 0 {
        return Err(ConfigError::invalid_value(
            "upstream",
            "reconnect_initial_ms",
            "must be greater than 0",
        ));
    }
    if upstream.reconnect_max_ms < upstream.reconnect_initial_ms {
        return Err(ConfigError::invalid_value(
            "upstream",
            "reconnect_max_ms",
            format!(
                "must be at least reconnect_initial_ms ({})",
                upstream.reconnect_initial_ms
            ),
        ));
    }

    if upstream.connect_timeout_secs == 0 {
        return Err(ConfigError::invalid_value(
            "upstream",
            "connect_timeout_secs",
            "must be greater than 0",
        ));
    }
    if upstream.read_timeout_secs == 0 {
        return Err(ConfigError::invalid_value(
            "upstream",
            "read_timeout_secs",
            "must be greater than 0",
        ));
    }
    if upstream.max_frame_size == 0 {
        return Err(ConfigError::invalid_value(
            "upstream",
            "max_frame_size",
            "must be greater than 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_max_subscribers() {
        let err = Config::from_str("[server]\nmax_subscribers = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_subscribers",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_host() {
        let err = Config::from_str("[server]\nhost = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "host", .. }));
    }

    #[test]
    fn test_non_http_url() {
        let err = Config::from_str("[upstream]\nurl = \"ws://example.com\"").unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_empty_url() {
        let err = Config::from_str("[upstream]\nurl = \" \"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "url", .. }));
    }

    #[test]
    fn test_zero_max_frame_size() {
        let err = Config::from_str("[upstream]\nmax_frame_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_frame_size",
                ..
            }
        ));
    }

    #[test]
    fn test_reconnect_max_below_initial() {
        let toml = "[upstream]\nreconnect_initial_ms = 1000\nreconnect_max_ms = 500";
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "reconnect_max_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_timeouts() {
        assert!(Config::from_str("[upstream]\nread_timeout_secs = 0").is_err());
        assert!(Config::from_str("[upstream]\nconnect_timeout_secs = 0").is_err());
        assert!(Config::from_str("[upstream]\nreconnect_initial_ms = 0").is_err());
    }
}
