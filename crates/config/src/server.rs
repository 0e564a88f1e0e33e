//! Subscriber-facing server configuration

use std::net::{Ipv6Addr, SocketAddr};

use serde::Deserialize;

/// WebSocket / HTTP server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"                # default
/// port = 4000                     # default, PORT env var overrides
/// max_subscribers = 1000          # default
/// heartbeat_interval_secs = 30    # default, 0 disables pings
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    /// Default: "0.0.0.0"
    pub host: String,

    /// Port to listen on
    /// Default: 4000
    pub port: u16,

    /// Maximum concurrent subscribers
    /// Default: 1000
    pub max_subscribers: usize,

    /// Interval between WebSocket pings
    /// Default: 30
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            max_subscribers: 1000,
            heartbeat_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address; bare IPv6 hosts are bracketed
    pub fn bind_address(&self) -> String {
        match self.host.parse::<Ipv6Addr>() {
            Ok(ip) => SocketAddr::from((ip, self.port)).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}
