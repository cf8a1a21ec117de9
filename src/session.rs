//! Session Worker
//!
//! Takes one accepted client connection through negotiation, authentication,
//! the CONNECT request, the upstream connection and finally the relay.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::metrics::BandwidthCounters;
use crate::protocol::{ConnectRequest, Credentials, ProtocolError, Socks5Handler, Socks5Response};
use crate::relay::{self, reply_code_for, RelayStats, UpstreamConnector};

/// Lifecycle of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    VersionSelect,
    Auth,
    Request,
    Connecting,
    Relaying,
    Closed,
}

/// One client connection and what has been learned about it so far
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub client_addr: SocketAddr,
    pub username: Option<String>,
    pub destination: Option<ConnectRequest>,
    pub started: Instant,
    state: SessionState,
}

impl Session {
    /// Fresh session for a just-accepted client
    pub fn new(client_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_addr,
            username: None,
            destination: None,
            started: Instant::now(),
            state: SessionState::VersionSelect,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Why a session ended before relaying
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Handshake(#[from] ProtocolError),
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: ConnectRequest,
        #[source]
        source: io::Error,
    },
}

/// Runs sessions against shared configuration and counters
#[derive(Debug, Clone)]
pub struct SessionWorker {
    credentials: Credentials,
    connector: UpstreamConnector,
    counters: Arc<BandwidthCounters>,
    buffer_size: usize,
}

impl SessionWorker {
    /// Build a worker from the auth, timeout and buffer settings
    pub fn new(config: &Config, counters: Arc<BandwidthCounters>) -> Self {
        Self {
            credentials: Credentials::new(
                config.auth.username.clone(),
                config.auth.password.clone(),
            ),
            connector: UpstreamConnector::from_config(config),
            counters,
            buffer_size: config.server.buffer_size,
        }
    }

    /// Serve one client connection to completion. Failures are logged, never returned.
    pub async fn run(&self, stream: TcpStream, client_addr: SocketAddr) {
        let mut session = Session::new(client_addr);
        let span = info_span!("session", id = %session.id, client = %client_addr);

        async {
            let _active = self.counters.session_started();
            info!("Handling client");

            match self.drive(&mut session, stream).await {
                Ok(stats) => {
                    info!(
                        bytes_up = stats.uploaded,
                        bytes_down = stats.downloaded,
                        duration_ms = session.started.elapsed().as_millis() as u64,
                        user = session.username.as_deref().unwrap_or("-"),
                        "Relay finished for {}",
                        session
                            .destination
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    );
                }
                Err(SessionError::Handshake(e)) if e.is_protocol_violation() => {
                    warn!("Closing client in state {:?}: {}", session.state(), e);
                }
                Err(e) => {
                    error!("Closing client in state {:?}: {}", session.state(), e);
                }
            }

            session.advance(SessionState::Closed);
            info!("Client disconnected");
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        session: &mut Session,
        stream: TcpStream,
    ) -> std::result::Result<RelayStats, SessionError> {
        let mut handler = Socks5Handler::new(stream);

        handler.negotiate_method().await?;

        session.advance(SessionState::Auth);
        let accepted = handler.authenticate(&self.credentials).await?;
        session.username = Some(accepted.username);

        session.advance(SessionState::Request);
        let request = handler.read_connect_request().await?;
        info!("Client requested {}", request);
        session.destination = Some(request.clone());

        session.advance(SessionState::Connecting);
        let upstream = match self.connector.connect(&request).await {
            Ok((upstream, _resolved)) => upstream,
            Err(source) => {
                let reply = Socks5Response::error(reply_code_for(&source));
                if let Err(e) = handler.send_response(reply).await {
                    debug!("Failed to send failure reply: {}", e);
                }
                return Err(SessionError::Connect {
                    target: request,
                    source,
                });
            }
        };

        handler.send_response(Socks5Response::success()).await?;

        session.advance(SessionState::Relaying);
        let client = handler.into_inner();
        Ok(relay::relay(client, upstream, &self.counters, self.buffer_size).await)
    }
}
