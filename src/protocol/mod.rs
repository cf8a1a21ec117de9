//! SOCKS5 Protocol Implementation
//!
//! Method negotiation, RFC 1929 authentication and CONNECT request parsing.

pub mod constants;
pub mod error;
pub mod handler;
pub mod types;

pub use constants::*;
pub use error::ProtocolError;
pub use handler::Socks5Handler;
pub use types::*;
