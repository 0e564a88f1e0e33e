//! Upstream SSE source configuration

use std::time::Duration;

use serde::Deserialize;

/// Default upstream stream URL
pub const DEFAULT_UPSTREAM_URL: &str = "https://tweet-service.herokuapp.com/stream";

/// Default cap on one SSE line or frame, in bytes
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Upstream ingestion configuration
///
/// # Example
///
/// ```toml
/// [upstream]
/// url = "https://tweet-service.herokuapp.com/stream"
/// reconnect_initial_ms = 500      # default
/// reconnect_max_ms = 30000        # default
/// max_retries = 20                # default: retry forever
/// connect_timeout_secs = 10       # default
/// read_timeout_secs = 90          # default
/// max_frame_size = 1048576        # default
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// SSE endpoint
    pub url: String,

    /// First reconnect delay in milliseconds
    /// Default: 500
    pub reconnect_initial_ms: u64,

    /// Reconnect delay cap in milliseconds
    /// Default: 30000
    pub reconnect_max_ms: u64,

    /// Consecutive failed attempts before giving up
    /// Default: unset (retry forever)
    pub max_retries: Option<u32>,

    /// Connect timeout in seconds
    /// Default: 10
    pub connect_timeout_secs: u64,

    /// Idle read timeout in seconds
    /// Default: 90
    pub read_timeout_secs: u64,

    /// Largest SSE line or frame kept in memory; bigger frames are dropped
    /// Default: 1 MiB
    pub max_frame_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            reconnect_initial_ms: 500,
            reconnect_max_ms: 30_000,
            max_retries: None,
            connect_timeout_secs: 10,
            read_timeout_secs: 90,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl UpstreamConfig {
    #[inline]
    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    #[inline]
    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UpstreamConfig::default();
        assert_eq!(config.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.reconnect_initial(), Duration::from_millis(500));
        assert_eq!(config.reconnect_max(), Duration::from_secs(30));
        assert_eq!(config.max_retries, None);
        assert_eq!(config.read_timeout(), Duration::from_secs(90));
        assert_eq!(config.max_frame_size, 1024 * 1024);
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
url = "http://localhost:9000/events"
max_retries = 5
read_timeout_secs = 15
max_frame_size = 4096
"#;
        let config: UpstreamConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "http://localhost:9000/events");
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.read_timeout(), Duration::from_secs(15));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_frame_size, 4096);
    }
}
