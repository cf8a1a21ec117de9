//! SOCKS5 Protocol Types

use crate::protocol::constants::*;
use std::fmt;
use std::net::Ipv4Addr;

/// Destination address carried by a CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    Ipv4(Ipv4Addr),
    Domain(String),
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ipv4(ip) => write!(f, "{}", ip),
            TargetAddr::Domain(domain) => f.write_str(domain),
        }
    }
}

/// Decoded CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub addr: TargetAddr,
    pub port: u16,
}

impl fmt::Display for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Username/password pair from an RFC 1929 sub-negotiation
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reply to a CONNECT request. The bind address and port are always zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socks5Response {
    pub reply_code: u8,
}

impl Socks5Response {
    /// Create a success response
    pub fn success() -> Self {
        Self {
            reply_code: SOCKS5_REPLY_SUCCESS,
        }
    }

    /// Create an error response
    pub fn error(reply_code: u8) -> Self {
        Self { reply_code }
    }

    /// Wire form: VER REP RSV ATYP(IPv4) 0.0.0.0 port 0
    pub fn to_bytes(&self) -> [u8; 10] {
        [
            SOCKS5_VERSION,
            self.reply_code,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_IPV4,
            0,
            0,
            0,
            0,
            0,
            0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_reply_bytes() {
        assert_eq!(
            Socks5Response::success().to_bytes(),
            [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_target_display() {
        let req = ConnectRequest {
            addr: TargetAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 1)),
            port: 443,
        };
        assert_eq!(req.to_string(), "10.0.0.1:443");

        let req = ConnectRequest {
            addr: TargetAddr::Domain("example.com".to_string()),
            port: 80,
        };
        assert_eq!(req.to_string(), "example.com:80");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("user", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
