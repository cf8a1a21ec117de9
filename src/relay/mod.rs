//! Data Relay Module
//!
//! Upstream connection setup and the bidirectional byte pump.

pub mod connector;
pub mod pump;

pub use connector::{reply_code_for, UpstreamConnector};
pub use pump::{pump, relay, RelayStats};
