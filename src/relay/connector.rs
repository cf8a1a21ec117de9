//! Upstream Connector

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::constants::*;
use crate::protocol::{ConnectRequest, TargetAddr};

/// Opens the destination connection for a CONNECT request
#[derive(Debug, Clone)]
pub struct UpstreamConnector {
    connect_timeout: Duration,
}

impl UpstreamConnector {
    /// Create a connector with the given resolve-and-connect budget
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Create a connector using the configured timeout
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.server.connect_timeout)
    }

    /// Resolve and connect, bounded as a whole by the connect timeout
    pub async fn connect(&self, request: &ConnectRequest) -> io::Result<(TcpStream, SocketAddr)> {
        debug!("Attempting to connect to target: {}", request);

        match timeout(self.connect_timeout, self.connect_any(request)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out after {:?}", request, self.connect_timeout),
            )),
        }
    }

    async fn connect_any(&self, request: &ConnectRequest) -> io::Result<(TcpStream, SocketAddr)> {
        let addrs = resolve(&request.addr, request.port).await?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!("Connected to target {} ({})", request, addr);
                    return Ok((stream, addr));
                }
                Err(e) => {
                    warn!("Failed to connect to {}: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {}", request.addr),
            )
        }))
    }
}

async fn resolve(target: &TargetAddr, port: u16) -> io::Result<Vec<SocketAddr>> {
    match target {
        TargetAddr::Ipv4(ip) => Ok(vec![SocketAddr::new(IpAddr::V4(*ip), port)]),
        TargetAddr::Domain(domain) => {
            let addrs: Vec<SocketAddr> = lookup_host((domain.as_str(), port)).await?.collect();
            debug!("Resolved {} to {} addresses", domain, addrs.len());
            Ok(addrs)
        }
    }
}

/// Map a connect failure to a SOCKS5 reply code
pub fn reply_code_for(error: &io::Error) -> u8 {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => return SOCKS5_REPLY_CONNECTION_REFUSED,
        io::ErrorKind::TimedOut => return SOCKS5_REPLY_TTL_EXPIRED,
        io::ErrorKind::NotFound => return SOCKS5_REPLY_HOST_UNREACHABLE,
        _ => {}
    }

    let message = error.to_string().to_lowercase();
    if message.contains("network is unreachable") || message.contains("network unreachable") {
        SOCKS5_REPLY_NETWORK_UNREACHABLE
    } else if message.contains("no route")
        || message.contains("host unreachable")
        || message.contains("lookup")
        || message.contains("name or service")
    {
        SOCKS5_REPLY_HOST_UNREACHABLE
    } else {
        SOCKS5_REPLY_GENERAL_FAILURE
    }
}
