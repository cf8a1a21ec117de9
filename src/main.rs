//! minisocks - minimal authenticated SOCKS5 proxy

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minisocks::config::{CliOverrides, ConfigManager};
use minisocks::{shutdown, ProxyServer};

/// CLI arguments for minisocks
#[derive(Parser, Debug)]
#[command(name = "minisocks")]
#[command(about = "Minimal authenticated SOCKS5 proxy")]
#[command(version)]
#[command(long_about = "
Minimal authenticated SOCKS5 proxy (CONNECT only, username/password auth).

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  MINISOCKS_HOST             - Listen host (e.g., 0.0.0.0)
  MINISOCKS_PORT             - Listen port
  MINISOCKS_USERNAME         - Accepted username
  MINISOCKS_PASSWORD         - Accepted password
  MINISOCKS_MAX_WORKERS      - Maximum concurrent sessions
  MINISOCKS_BUFFER_SIZE      - Relay buffer size in bytes
  MINISOCKS_CONNECT_TIMEOUT  - Upstream connect timeout (e.g., 10s)
  MINISOCKS_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "minisocks.toml")]
    pub config: PathBuf,

    /// Listen host (overrides config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Accepted username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Accepted password
    #[arg(long)]
    pub password: Option<String>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Relay buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Upstream connect timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}

impl CliArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            max_workers: self.max_workers,
            buffer_size: self.buffer_size,
            connect_timeout_secs: self.connect_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(&args.overrides());
    if let Some(level) = &args.log_level {
        config.monitoring.log_level = level.clone();
    }

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config.monitoring.log_level);

    info!("Starting minisocks v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Listen address: {}", config.server.listen_addr());
        info!("  Max workers: {}", config.server.max_workers);
        info!("  Buffer size: {} bytes", config.server.buffer_size);
        info!("  Connect timeout: {:?}", config.server.connect_timeout);
        return Ok(());
    }

    info!("Listen address: {}", config.server.listen_addr());
    info!("Max workers: {}", config.server.max_workers);

    let status_interval = config.monitoring.status_interval;
    let server = ProxyServer::new(Arc::new(config));

    let server_handle = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    let status_handle = (!status_interval.is_zero()).then(|| {
        let server = server.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(status_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                server.status().log();
            }
        })
    });

    if let Err(e) = shutdown::wait_for_signal().await {
        error!("Error setting up signal handlers: {}", e);
    }

    server_handle.abort();
    if let Some(handle) = status_handle {
        handle.abort();
    }

    let status = server.status();
    status.log();
    match status.to_json() {
        Ok(json) => info!("Final status: {}", json),
        Err(e) => warn!("Failed to serialize final status: {}", e),
    }
    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) {
    let log_level = if args.verbose { "debug" } else { configured_level };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();
}
