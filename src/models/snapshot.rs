use std::time::Duration;

use chrono::{DateTime, Local};

use crate::constants::UNKNOWN;
use crate::models::MediaType;

/// Result of one reachability probe burst.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub struct ReachabilityResult {
    /// Echo requests attempted.
    pub attempts: u32,
    /// Echo requests that received a reply in time.
    pub successes: u32,
    /// Average round-trip time over successes. None = no data (zero
    /// successes), distinct from a zero-millisecond latency.
    pub avg_latency: Option<Duration>,
    /// Packet loss percentage, 0-100.
    pub loss_pct: u8,
    pub reachable: bool,
}

impl ReachabilityResult {
    /// The fully-offline result: probe facility unavailable or every
    /// echo lost.
    pub fn offline(attempts: u32) -> Self {
        Self {
            attempts,
            successes: 0,
            avg_latency: None,
            loss_pct: 100,
            reachable: false,
        }
    }
}

/// Wireless association metadata, best-effort. Each field degrades to
/// unknown independently of the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WifiMetadata {
    pub ssid: Option<String>,
    /// Signal quality, 0-100.
    pub signal_pct: Option<u8>,
    pub bssid: Option<String>,
}

impl WifiMetadata {
    pub fn ssid_display(&self) -> String {
        self.ssid.clone().unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn signal_display(&self) -> String {
        self.signal_pct
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn bssid_display(&self) -> String {
        self.bssid.clone().unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Traffic direction classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Downloading,
    Uploading,
    Idle,
}

impl Activity {
    /// Classify by comparing rates (bytes/sec) against a threshold.
    /// The busier direction wins; neither direction above the threshold
    /// is Idle.
    pub fn classify(rx_rate: f64, tx_rate: f64, threshold: f64) -> Self {
        if rx_rate > threshold && rx_rate > tx_rate {
            Activity::Downloading
        } else if tx_rate > threshold && tx_rate > rx_rate {
            Activity::Uploading
        } else {
            Activity::Idle
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Activity::Downloading => "Downloading...",
            Activity::Uploading => "Uploading...",
            Activity::Idle => "Idle",
        }
    }
}

/// Identity of the active adapter as shown to the user.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct AdapterSummary {
    pub name: String,
    pub media: MediaType,
    pub is_up: bool,
}

/// The externally published result of one sampling tick.
///
/// Immutable once produced; every tick yields a new snapshot.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub captured_at: DateTime<Local>,
    /// None = no active interface this tick (explicit offline state).
    pub adapter: Option<AdapterSummary>,
    pub local_ip: String,
    pub gateway: String,
    pub dns: String,
    pub public_ip: String,
    /// Receive rate, bytes/sec.
    pub rx_rate: f64,
    /// Transmit rate, bytes/sec.
    pub tx_rate: f64,
    pub reachability: ReachabilityResult,
    /// Present only when the active interface is wireless.
    pub wifi: Option<WifiMetadata>,
    pub activity: Activity,
}

impl TelemetrySnapshot {
    /// The explicit offline snapshot emitted when no active interface
    /// exists: internet offline, zero rates, all addresses unknown.
    pub fn offline() -> Self {
        Self {
            captured_at: Local::now(),
            adapter: None,
            local_ip: UNKNOWN.to_string(),
            gateway: UNKNOWN.to_string(),
            dns: UNKNOWN.to_string(),
            public_ip: UNKNOWN.to_string(),
            rx_rate: 0.0,
            tx_rate: 0.0,
            reachability: ReachabilityResult::offline(0),
            wifi: None,
            activity: Activity::Idle,
        }
    }

    pub fn is_online(&self) -> bool {
        self.reachability.reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: f64 = 1024.0 * 1024.0;

    // ── Activity::classify ────────────────────────────────────────

    #[test]
    fn classify_downloading_when_rx_dominates() {
        assert_eq!(
            Activity::classify(2.0 * MB, 0.5 * MB, MB),
            Activity::Downloading
        );
    }

    #[test]
    fn classify_uploading_when_tx_dominates() {
        assert_eq!(
            Activity::classify(0.5 * MB, 2.0 * MB, MB),
            Activity::Uploading
        );
    }

    #[test]
    fn classify_idle_below_threshold() {
        assert_eq!(Activity::classify(0.5 * MB, 0.5 * MB, MB), Activity::Idle);
    }

    #[test]
    fn classify_both_above_threshold_higher_wins() {
        assert_eq!(
            Activity::classify(3.0 * MB, 2.0 * MB, MB),
            Activity::Downloading
        );
        assert_eq!(
            Activity::classify(2.0 * MB, 3.0 * MB, MB),
            Activity::Uploading
        );
    }

    // ── Offline snapshot ──────────────────────────────────────────

    #[test]
    fn offline_snapshot_has_no_data() {
        let snap = TelemetrySnapshot::offline();
        assert!(snap.adapter.is_none());
        assert!(!snap.is_online());
        assert_eq!(snap.rx_rate, 0.0);
        assert_eq!(snap.tx_rate, 0.0);
        assert_eq!(snap.local_ip, "unknown");
        assert_eq!(snap.public_ip, "unknown");
        assert_eq!(snap.activity, Activity::Idle);
    }

    #[test]
    fn offline_reachability_sentinel() {
        let r = ReachabilityResult::offline(20);
        assert_eq!(r.loss_pct, 100);
        assert!(r.avg_latency.is_none());
        assert!(!r.reachable);
    }
}
