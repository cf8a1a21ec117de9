//! minisocks
//!
//! A minimal SOCKS5 proxy: username/password authentication, CONNECT to
//! IPv4 or domain destinations, and a bidirectional relay that feeds shared
//! bandwidth counters.

pub mod config;
pub mod metrics;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod shutdown;

pub use config::Config;
pub use metrics::{BandwidthCounters, StatusReport};
pub use server::ProxyServer;
pub use session::SessionWorker;

/// Common error type for the proxy server
pub type Result<T> = anyhow::Result<T>;
