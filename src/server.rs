//! Proxy Listener
//!
//! Binds the listening socket, admits accepted connections onto a bounded
//! pool of session slots and keeps the listener alive across bind failures.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::metrics::{BandwidthCounters, StatusReport};
use crate::session::SessionWorker;
use crate::Result;

/// SOCKS5 proxy server
#[derive(Debug, Clone)]
pub struct ProxyServer {
    config: Arc<Config>,
    worker: Arc<SessionWorker>,
    counters: Arc<BandwidthCounters>,
    session_slots: Arc<Semaphore>,
    running: Arc<AtomicBool>,
}

impl ProxyServer {
    /// Create a server with fresh counters
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_counters(config, Arc::new(BandwidthCounters::new()))
    }

    /// Build a server that writes into existing counters
    pub fn with_counters(config: Arc<Config>, counters: Arc<BandwidthCounters>) -> Self {
        let worker = Arc::new(SessionWorker::new(&config, Arc::clone(&counters)));
        let session_slots = Arc::new(Semaphore::new(config.server.max_workers));

        Self {
            config,
            worker,
            counters,
            session_slots,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared counters fed by every session
    pub fn counters(&self) -> Arc<BandwidthCounters> {
        Arc::clone(&self.counters)
    }

    /// True while a listener is bound and accepting
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of the running flag and counters
    pub fn status(&self) -> StatusReport {
        StatusReport::capture(self.is_running(), &self.counters)
    }

    /// Bind with address reuse and listen with the configured backlog
    pub async fn bind(&self) -> Result<TcpListener> {
        let listen_addr = self.config.server.listen_addr();
        let addr: SocketAddr = lookup_host(listen_addr.as_str())
            .await
            .with_context(|| format!("Failed to resolve listen address {}", listen_addr))?
            .next()
            .with_context(|| format!("No address for {}", listen_addr))?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .context("Failed to create listening socket")?;

        socket
            .set_reuseaddr(true)
            .context("Failed to enable SO_REUSEADDR")?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed to bind {}", addr))?;

        let listener = socket
            .listen(self.config.server.backlog)
            .with_context(|| format!("Failed to listen on {}", addr))?;

        info!("Successfully bound to {}", addr);
        Ok(listener)
    }

    /// Bind and serve forever, restarting after every bind failure
    pub async fn run(&self) {
        let restart_delay = self.config.server.restart_delay;

        loop {
            match self.bind().await {
                Ok(listener) => self.serve(listener).await,
                Err(e) => {
                    error!(
                        "Proxy server failed to start on {}: {:#}",
                        self.config.server.listen_addr(),
                        e
                    );
                }
            }

            self.running.store(false, Ordering::Release);
            info!("Restarting listener in {:?}", restart_delay);
            tokio::time::sleep(restart_delay).await;
        }
    }

    /// Accept connections from `listener` and never return.
    ///
    /// Each connection gets its own task, which waits for a session slot
    /// before the handshake starts.
    pub async fn serve(&self, listener: TcpListener) {
        let retry_delay = self.config.server.accept_retry_delay;
        self.running.store(true, Ordering::Release);

        match listener.local_addr() {
            Ok(addr) => info!(
                "Proxy server running on {} (max {} concurrent sessions)",
                addr, self.config.server.max_workers
            ),
            Err(e) => warn!("Proxy server running on unknown address: {}", e),
        }

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting client: {}", e);
                    tokio::time::sleep(retry_delay).await;
                    continue;
                }
            };

            info!("New client connection from {}", addr);

            let worker = Arc::clone(&self.worker);
            let slots = Arc::clone(&self.session_slots);
            tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only fails on a bug
                let _slot = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Session slot unavailable for {}: {}", addr, e);
                        return;
                    }
                };
                debug!("Admitted {}", addr);
                worker.run(stream, addr).await;
            });
        }
    }
}
