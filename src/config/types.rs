//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub monitoring: MonitoringConfig,
}

/// Listener and session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on concurrently admitted sessions
    pub max_workers: usize,
    pub backlog: u32,
    /// Relay read buffer size in bytes
    pub buffer_size: usize,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub accept_retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub restart_delay: Duration,
}

/// Fixed username/password accepted by the proxy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// Logging and status reporting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    /// Interval between status snapshots in the log; zero disables them
    #[serde(with = "humantime_serde")]
    pub status_interval: Duration,
}

impl ServerConfig {
    /// `host:port` string used for binding and logging
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1083,
            max_workers: 20,
            backlog: 5,
            buffer_size: 4096,
            connect_timeout: Duration::from_secs(10),
            accept_retry_delay: Duration::from_secs(1),
            restart_delay: Duration::from_secs(5),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "proxyuser".to_string(),
            password: "proxypass".to_string(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            status_interval: Duration::from_secs(60),
        }
    }
}
