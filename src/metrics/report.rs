//! Status Report
//!
//! Point-in-time snapshot of everything an external status page reads.

use super::{BandwidthCounters, Mbps};
use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub running: bool,
    pub active_sessions: usize,
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
    pub upload_mbps: f64,
    pub download_mbps: f64,
    /// Unix timestamp (seconds) of counter creation
    pub started_at: u64,
    pub uptime_secs: u64,
}

impl StatusReport {
    /// Read the counters into a new snapshot
    pub fn capture(running: bool, counters: &BandwidthCounters) -> Self {
        let bandwidth = counters.bandwidth();
        let started_at = counters
            .started_at()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            running,
            active_sessions: counters.active_sessions(),
            uploaded_bytes: counters.uploaded(),
            downloaded_bytes: counters.downloaded(),
            upload_mbps: bandwidth.upload.0,
            download_mbps: bandwidth.download.0,
            started_at,
            uptime_secs: counters.elapsed().as_secs(),
        }
    }

    /// Serialize the snapshot for the status page
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Emit the snapshot as structured log fields
    pub fn log(&self) {
        info!(
            running = self.running,
            active_sessions = self.active_sessions,
            uploaded_bytes = self.uploaded_bytes,
            downloaded_bytes = self.downloaded_bytes,
            upload_mbps = %Mbps(self.upload_mbps),
            download_mbps = %Mbps(self.download_mbps),
            uptime_secs = self.uptime_secs,
            "Proxy status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_capture_reflects_counters() {
        let counters = Arc::new(BandwidthCounters::new());
        counters.add_upload(512);
        counters.add_download(2048);
        let _guard = counters.session_started();

        let report = StatusReport::capture(true, &counters);
        assert!(report.running);
        assert_eq!(report.active_sessions, 1);
        assert_eq!(report.uploaded_bytes, 512);
        assert_eq!(report.downloaded_bytes, 2048);
        // Counters were created just now, so the rate is still the zero sentinel
        assert_eq!(report.upload_mbps, 0.0);
        assert!(report.started_at > 0);
    }

    #[test]
    fn test_json_roundtrip_fields() {
        let counters = BandwidthCounters::new();
        let report = StatusReport::capture(false, &counters);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["running"], false);
        assert_eq!(value["active_sessions"], 0);
        assert!(value.get("download_mbps").is_some());
    }
}
