//! Bandwidth Counters
//!
//! Traffic totals and the active-session gauge shared by every session and
//! relay pump. One instance is created per server and handed out by `Arc`.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// Direction of a relayed byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to destination
    Upload,
    /// Destination to client
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// Average rate in megabits per second
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Mbps(pub f64);

impl Mbps {
    /// No traffic, or under a second of uptime
    pub const ZERO: Mbps = Mbps(0.0);

    fn from_bytes(bytes: u64, elapsed: Duration) -> Self {
        Mbps((bytes as f64 * 8.0) / (elapsed.as_secs_f64() * 1_000_000.0))
    }
}

impl fmt::Display for Mbps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} Mbps", self.0)
    }
}

/// Average upload and download rates since the counters were created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bandwidth {
    pub upload: Mbps,
    pub download: Mbps,
}

impl Bandwidth {
    /// Returned while less than a second has elapsed
    pub const ZERO: Bandwidth = Bandwidth {
        upload: Mbps::ZERO,
        download: Mbps::ZERO,
    };
}

/// Shared traffic counters
#[derive(Debug)]
pub struct BandwidthCounters {
    uploaded: AtomicU64,
    downloaded: AtomicU64,
    active_sessions: AtomicUsize,
    started: Instant,
    started_at: SystemTime,
}

impl BandwidthCounters {
    /// Create zeroed counters starting their clock now
    pub fn new() -> Self {
        Self {
            uploaded: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
            active_sessions: AtomicUsize::new(0),
            started: Instant::now(),
            started_at: SystemTime::now(),
        }
    }

    /// Record bytes sent from a client towards its destination
    pub fn add_upload(&self, bytes: u64) {
        self.uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record bytes sent from a destination back to its client
    pub fn add_download(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add to the counter matching `direction`
    pub fn add(&self, direction: Direction, bytes: u64) {
        match direction {
            Direction::Upload => self.add_upload(bytes),
            Direction::Download => self.add_download(bytes),
        }
    }

    /// Total bytes relayed client to destination
    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Relaxed)
    }

    /// Total bytes relayed destination to client
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Number of sessions currently admitted
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Acquire)
    }

    /// Count a session as active until the returned guard is dropped
    pub fn session_started(self: &Arc<Self>) -> SessionGuard {
        let active = self.active_sessions.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Session started, {} active", active);
        SessionGuard {
            counters: Arc::clone(self),
        }
    }

    /// Wall-clock creation time
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time since creation
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average rates since creation
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth_at(self.elapsed())
    }

    /// Average rates over `elapsed`; below one second the rate is reported as zero
    pub fn bandwidth_at(&self, elapsed: Duration) -> Bandwidth {
        if elapsed < Duration::from_secs(1) {
            return Bandwidth::ZERO;
        }

        Bandwidth {
            upload: Mbps::from_bytes(self.uploaded(), elapsed),
            download: Mbps::from_bytes(self.downloaded(), elapsed),
        }
    }
}

impl Default for BandwidthCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the active-session count exactly once, when dropped
#[derive(Debug)]
pub struct SessionGuard {
    counters: Arc<BandwidthCounters>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let previous = self.counters.active_sessions.fetch_sub(1, Ordering::AcqRel);
        debug!("Session ended, {} active", previous - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_counters() {
        let counters = BandwidthCounters::new();
        counters.add(Direction::Upload, 100);
        counters.add(Direction::Download, 40);
        counters.add_upload(1);

        assert_eq!(counters.uploaded(), 101);
        assert_eq!(counters.downloaded(), 40);
    }

    #[test]
    fn test_guard_decrements_once() {
        let counters = Arc::new(BandwidthCounters::new());
        let first = counters.session_started();
        let second = counters.session_started();
        assert_eq!(counters.active_sessions(), 2);

        drop(first);
        assert_eq!(counters.active_sessions(), 1);
        drop(second);
        assert_eq!(counters.active_sessions(), 0);
    }

    #[test]
    fn test_zero_rate_under_one_second() {
        let counters = BandwidthCounters::new();
        counters.add_upload(10_000_000);
        counters.add_download(10_000_000);

        assert_eq!(counters.bandwidth_at(Duration::from_millis(999)), Bandwidth::ZERO);
        assert_eq!(counters.bandwidth_at(Duration::ZERO), Bandwidth::ZERO);
    }

    #[test]
    fn test_average_rate() {
        let counters = BandwidthCounters::new();
        counters.add_upload(1_250_000);
        counters.add_download(2_500_000);

        let rate = counters.bandwidth_at(Duration::from_secs(2));
        assert!((rate.upload.0 - 5.0).abs() < 1e-9);
        assert!((rate.download.0 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_mbps_display() {
        assert_eq!(Mbps(1.23456).to_string(), "1.23 Mbps");
        assert_eq!(Mbps::ZERO.to_string(), "0.00 Mbps");
    }
}
