//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "MINISOCKS_";

/// Manages configuration loading and validation
pub struct ConfigManager;

/// Values supplied on the command line; `None` leaves the loaded value alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_workers: Option<usize>,
    pub buffer_size: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
}

impl ConfigManager {
    /// Load configuration from a TOML file, falling back to defaults when it is missing
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from `MINISOCKS_*` environment variables on top of defaults
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid {ENV_PREFIX}PORT: {}", port))?;
        }

        if let Some(username) = var("USERNAME") {
            self.auth.username = username;
        }

        if let Some(password) = var("PASSWORD") {
            self.auth.password = password;
        }

        if let Some(workers) = var("MAX_WORKERS") {
            self.server.max_workers = workers
                .parse::<usize>()
                .with_context(|| format!("Invalid {ENV_PREFIX}MAX_WORKERS: {}", workers))?;
        }

        if let Some(buffer_size) = var("BUFFER_SIZE") {
            self.server.buffer_size = buffer_size
                .parse::<usize>()
                .with_context(|| format!("Invalid {ENV_PREFIX}BUFFER_SIZE: {}", buffer_size))?;
        }

        if let Some(timeout) = var("CONNECT_TIMEOUT") {
            self.server.connect_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid {ENV_PREFIX}CONNECT_TIMEOUT: {}", timeout))?;
        }

        if let Some(log_level) = var("LOG_LEVEL") {
            self.monitoring.log_level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_auth_config()
            .with_context(|| "Authentication configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("host must not be empty");
        }

        if self.server.max_workers == 0 {
            bail!("max_workers must be greater than 0");
        }

        if self.server.backlog == 0 {
            bail!("backlog must be greater than 0");
        }

        if self.server.buffer_size == 0 {
            bail!("buffer_size must be greater than 0");
        }

        if self.server.buffer_size > 1_048_576 {
            bail!("buffer_size cannot exceed 1MB");
        }

        if self.server.connect_timeout.is_zero() {
            bail!("connect_timeout must be greater than 0");
        }

        Ok(())
    }

    /// RFC 1929 carries both fields behind a one-byte length
    fn validate_auth_config(&self) -> Result<()> {
        if self.auth.username.len() > 255 {
            bail!("username exceeds 255 bytes");
        }

        if self.auth.password.len() > 255 {
            bail!("password exceeds 255 bytes");
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, overrides: &CliOverrides) {
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
            tracing::info!("CLI override: host set to {}", host);
        }

        if let Some(port) = overrides.port {
            self.server.port = port;
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(username) = &overrides.username {
            self.auth.username = username.clone();
            tracing::info!("CLI override: username set to {}", username);
        }

        if let Some(password) = &overrides.password {
            self.auth.password = password.clone();
            tracing::info!("CLI override: password updated");
        }

        if let Some(workers) = overrides.max_workers {
            self.server.max_workers = workers;
            tracing::info!("CLI override: max workers set to {}", workers);
        }

        if let Some(buffer_size) = overrides.buffer_size {
            self.server.buffer_size = buffer_size;
            tracing::info!("CLI override: buffer size set to {} bytes", buffer_size);
        }

        if let Some(timeout_secs) = overrides.connect_timeout_secs {
            self.server.connect_timeout = Duration::from_secs(timeout_secs);
            tracing::info!("CLI override: connect timeout set to {}s", timeout_secs);
        }
    }
}
