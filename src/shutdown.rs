//! Shutdown Signals
//!
//! The proxy has no graceful drain: in-flight sessions are abandoned when the
//! process exits. This module only waits for the signal that ends it.

use crate::Result;
use tokio::signal;
use tracing::info;

/// Wait for SIGTERM, SIGINT or Ctrl+C
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}
