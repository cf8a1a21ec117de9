//! Handshake errors

use thiserror::Error;

/// Reasons a SOCKS5 handshake is abandoned
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported SOCKS version: {0:#04x}")]
    UnsupportedVersion(u8),
    #[error("invalid username/password sub-negotiation version: {0:#04x}")]
    InvalidAuthVersion(u8),
    #[error("authentication failed for user '{0}'")]
    AuthenticationFailed(String),
    #[error("unsupported command: {0:#04x}")]
    UnsupportedCommand(u8),
    #[error("unsupported address type: {0:#04x}")]
    UnsupportedAddressType(u8),
    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for client misbehaviour, false for transport failures
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}
