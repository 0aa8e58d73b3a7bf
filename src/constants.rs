//! Application-wide constants.
//!
//! Centralizes all magic numbers, timings, and configuration defaults
//! so nothing is scattered across the codebase.

use std::path::PathBuf;
use std::time::Duration;

// ── Timing ────────────────────────────────────────────────────────
/// Default sampling period (ms).
pub const DEFAULT_TICK_MS: u64 = 1000;
/// Minimum allowed sampling period (ms) to prevent excessive probing.
pub const MIN_TICK_MS: u64 = 250;
/// Settle delay after the admin-disable command (ms).
pub const DISABLE_SETTLE_MS: u64 = 500;
/// Settle delay after the admin-enable command (ms). Enabling takes longer
/// to reflect in OS state than disabling.
pub const ENABLE_SETTLE_MS: u64 = 1500;

// ── Reachability Probe ────────────────────────────────────────────
/// Echo requests per probe burst. 20 samples = 5% loss resolution.
pub const PROBE_SAMPLE_COUNT: u32 = 20;
/// Per-echo timeout (ms).
pub const PROBE_TIMEOUT_MS: u64 = 600;
/// Spacing between echoes (ms), keeps the burst light.
pub const PROBE_SPACING_MS: u64 = 30;
/// Default probe target.
pub const DEFAULT_PROBE_TARGET: &str = "8.8.8.8";
/// Slack added on top of the worst-case burst duration before the
/// sampling loop gives up on a probe burst (ms).
pub const PROBE_BURST_SLACK_MS: u64 = 2000;
/// Cosmetic loss jitter amplitude (percentage points).
pub const LOSS_JITTER_PCT: i16 = 2;

// ── Rates ─────────────────────────────────────────────────────────
/// Floor for the elapsed interval in rate computation.
pub const MIN_RATE_INTERVAL: Duration = Duration::from_millis(1);
/// Activity classification threshold (bytes/sec): 1 MB/s.
pub const ACTIVITY_THRESHOLD_BYTES: f64 = 1024.0 * 1024.0;

// ── Public Address ────────────────────────────────────────────────
/// Default public IP echo endpoint (plain-text body).
pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";
/// HTTP timeout for the IP echo request (seconds).
pub const IP_ECHO_TIMEOUT_SECS: u64 = 3;

// ── Interface Selection ───────────────────────────────────────────
/// Description substrings that exclude an adapter from selection.
pub const EXCLUDED_DESCRIPTION_TOKENS: &[&str] = &["virtual", "loopback"];

// ── Display ───────────────────────────────────────────────────────
/// Placeholder for values that could not be determined.
pub const UNKNOWN: &str = "unknown";

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/netpulse/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("netpulse")
}

/// Returns `~/.config/netpulse/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
