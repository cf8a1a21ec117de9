//! SOCKS5 Protocol Handler
//!
//! Drives the server side of a handshake over any async byte stream:
//! method selection, RFC 1929 username/password authentication and the
//! CONNECT request.

use super::{ConnectRequest, Credentials, ProtocolError, Socks5Response, TargetAddr};
use crate::protocol::constants::*;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

type HandshakeResult<T> = std::result::Result<T, ProtocolError>;

/// SOCKS5 protocol handler for client connections
pub struct Socks5Handler<S> {
    stream: S,
}

impl<S> Socks5Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new SOCKS5 handler for the given stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read the method-selection message and advertise username/password.
    ///
    /// Only the version byte is checked; the offered methods are read and ignored.
    pub async fn negotiate_method(&mut self) -> HandshakeResult<()> {
        let mut header = [0u8; 2];
        self.stream.read_exact(&mut header).await?;

        let version = header[0];
        if version != SOCKS5_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let mut methods = vec![0u8; header[1] as usize];
        self.stream.read_exact(&mut methods).await?;
        debug!("Client offered auth methods {:?}", methods);

        self.stream
            .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_USERPASS])
            .await?;
        Ok(())
    }

    /// Read the username/password sub-negotiation (RFC 1929)
    pub async fn read_credentials(&mut self) -> HandshakeResult<Credentials> {
        // +----+------+----------+------+----------+
        // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
        // +----+------+----------+------+----------+
        // | 1  |  1   | 0 to 255 |  1   | 0 to 255 |
        // +----+------+----------+------+----------+
        let version = self.stream.read_u8().await?;
        if version != SOCKS5_USERPASS_VERSION {
            return Err(ProtocolError::InvalidAuthVersion(version));
        }

        let username = self.read_short_string().await?;
        let password = self.read_short_string().await?;

        Ok(Credentials { username, password })
    }

    /// Send username/password authentication status
    pub async fn send_auth_status(&mut self, success: bool) -> HandshakeResult<()> {
        let status = if success {
            SOCKS5_USERPASS_SUCCESS
        } else {
            SOCKS5_USERPASS_FAILURE
        };
        self.stream
            .write_all(&[SOCKS5_USERPASS_VERSION, status])
            .await?;
        Ok(())
    }

    /// Run the sub-negotiation and check the result against `expected`.
    ///
    /// The status reply is written in both outcomes.
    pub async fn authenticate(&mut self, expected: &Credentials) -> HandshakeResult<Credentials> {
        let offered = self.read_credentials().await?;
        let accepted = offered == *expected;
        self.send_auth_status(accepted).await?;

        if accepted {
            Ok(offered)
        } else {
            Err(ProtocolError::AuthenticationFailed(offered.username))
        }
    }

    /// Read and decode the CONNECT request
    pub async fn read_connect_request(&mut self) -> HandshakeResult<ConnectRequest> {
        // VER CMD RSV ATYP
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).await?;

        let version = header[0];
        let command = header[1];
        let address_type = header[3];

        if version != SOCKS5_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        if command != SOCKS5_CMD_CONNECT {
            return Err(ProtocolError::UnsupportedCommand(command));
        }

        let addr = match address_type {
            SOCKS5_ADDR_IPV4 => {
                let mut octets = [0u8; 4];
                self.stream.read_exact(&mut octets).await?;
                TargetAddr::Ipv4(Ipv4Addr::from(octets))
            }
            SOCKS5_ADDR_DOMAIN => TargetAddr::Domain(self.read_short_string().await?),
            other => return Err(ProtocolError::UnsupportedAddressType(other)),
        };

        let port = self.stream.read_u16().await?;

        Ok(ConnectRequest { addr, port })
    }

    /// Send a CONNECT reply to the client
    pub async fn send_response(&mut self, response: Socks5Response) -> HandshakeResult<()> {
        self.stream.write_all(&response.to_bytes()).await?;
        Ok(())
    }

    /// Hand the stream back for relaying
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// One length byte followed by that many bytes, decoded lossily
    async fn read_short_string(&mut self) -> HandshakeResult<String> {
        let len = self.stream.read_u8().await? as usize;
        let mut bytes = vec![0u8; len];
        self.stream.read_exact(&mut bytes).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn auth_message(user: &[u8], pass: &[u8]) -> Vec<u8> {
        let mut msg = vec![0x01, user.len() as u8];
        msg.extend_from_slice(user);
        msg.push(pass.len() as u8);
        msg.extend_from_slice(pass);
        msg
    }

    #[tokio::test]
    async fn test_method_negotiation_advertises_userpass() {
        let mock = Builder::new()
            .read(&[0x05, 0x02, 0x00, 0x02])
            .write(&[0x05, 0x02])
            .build();

        let mut handler = Socks5Handler::new(mock);
        handler.negotiate_method().await.unwrap();
    }

    #[tokio::test]
    async fn test_method_negotiation_ignores_offered_methods() {
        // Only no-auth offered; the server still selects username/password
        let mock = Builder::new()
            .read(&[0x05, 0x01, 0x00])
            .write(&[0x05, 0x02])
            .build();

        let mut handler = Socks5Handler::new(mock);
        handler.negotiate_method().await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_version_gets_no_reply() {
        let mock = Builder::new().read(&[0x04, 0x01]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.negotiate_method().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedVersion(0x04)));
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mock = Builder::new()
            .read(&auth_message(b"proxyuser", b"proxypass"))
            .write(&[0x01, 0x00])
            .build();

        let mut handler = Socks5Handler::new(mock);
        let creds = handler
            .authenticate(&Credentials::new("proxyuser", "proxypass"))
            .await
            .unwrap();
        assert_eq!(creds.username, "proxyuser");
    }

    #[tokio::test]
    async fn test_authenticate_failure_replies_then_errors() {
        let mock = Builder::new()
            .read(&auth_message(b"proxyuser", b"wrong"))
            .write(&[0x01, 0x01])
            .build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler
            .authenticate(&Credentials::new("proxyuser", "proxypass"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailed(ref u) if u == "proxyuser"));
    }

    #[tokio::test]
    async fn test_bad_subnegotiation_version() {
        let mock = Builder::new().read(&[0x05]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.read_credentials().await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAuthVersion(0x05)));
    }

    #[tokio::test]
    async fn test_credentials_decode_lossily() {
        let mock = Builder::new()
            .read(&auth_message(&[0xff, b'a'], b""))
            .build();

        let mut handler = Socks5Handler::new(mock);
        let creds = handler.read_credentials().await.unwrap();
        assert_eq!(creds.username, "\u{FFFD}a");
        assert_eq!(creds.password, "");
    }

    #[tokio::test]
    async fn test_connect_request_ipv4() {
        let mock = Builder::new()
            .read(&[0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x1f, 0x90])
            .build();

        let mut handler = Socks5Handler::new(mock);
        let request = handler.read_connect_request().await.unwrap();
        assert_eq!(request.addr, TargetAddr::Ipv4(Ipv4Addr::LOCALHOST));
        assert_eq!(request.port, 8080);
    }

    #[tokio::test]
    async fn test_connect_request_domain() {
        let mut msg = vec![0x05, 0x01, 0x00, 0x03, 11];
        msg.extend_from_slice(b"example.com");
        msg.extend_from_slice(&443u16.to_be_bytes());
        let mock = Builder::new().read(&msg).build();

        let mut handler = Socks5Handler::new(mock);
        let request = handler.read_connect_request().await.unwrap();
        assert_eq!(request.addr, TargetAddr::Domain("example.com".to_string()));
        assert_eq!(request.port, 443);
    }

    #[tokio::test]
    async fn test_bind_command_rejected() {
        let mock = Builder::new().read(&[0x05, 0x02, 0x00, 0x01]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.read_connect_request().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedCommand(0x02)));
    }

    #[tokio::test]
    async fn test_ipv6_address_type_rejected() {
        let mock = Builder::new().read(&[0x05, 0x01, 0x00, 0x04]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.read_connect_request().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedAddressType(0x04)));
    }

    #[tokio::test]
    async fn test_truncated_request_is_io_error() {
        let mock = Builder::new().read(&[0x05, 0x01]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.read_connect_request().await.unwrap_err();
        assert!(!err.is_protocol_violation());
    }
}
