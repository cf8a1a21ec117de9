//! Traffic Metrics
//!
//! Shared bandwidth counters and the status snapshot built from them.

pub mod counters;
pub mod report;

pub use counters::{Bandwidth, BandwidthCounters, Direction, Mbps, SessionGuard};
pub use report::StatusReport;
