//! Wireless association metadata via the platform diagnostic command.
//!
//! Free-text diagnostic output is inherently fragile to parse, so this
//! stays a narrow best-effort seam: SSID, signal, and BSSID are extracted
//! independently from labeled lines, each one defaulting to unknown on
//! its own, and any failure to launch or read the command yields
//! all-unknown. The engine never depends on all three fields being
//! present together.

use std::process::Command;

use tracing::debug;

use crate::models::WifiMetadata;

/// Reads the OS wireless status for one interface.
pub struct WifiStatusReader;

impl WifiStatusReader {
    pub fn new() -> Self {
        Self
    }

    /// Best-effort metadata for `ifname`. Only called when the active
    /// interface is wireless.
    pub fn read(&self, ifname: &str) -> WifiMetadata {
        match run_status_command(ifname) {
            Some(text) => parse_wifi_output(&text),
            None => {
                debug!(ifname, "wireless status command unavailable");
                WifiMetadata::default()
            }
        }
    }
}

fn run_status_command(ifname: &str) -> Option<String> {
    #[cfg(windows)]
    let output = Command::new("netsh")
        .args(["wlan", "show", "interfaces"])
        .output()
        .ok()?;

    #[cfg(not(windows))]
    let output = Command::new("iw")
        .args(["dev", ifname, "link"])
        .output()
        .ok()?;

    #[cfg(windows)]
    let _ = ifname;

    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract SSID / Signal / BSSID from labeled diagnostic lines.
///
/// Accepts both the `Label : value` table shape (netsh) and the
/// `label: value` shape (iw), whose association block also leads with
/// `Connected to <bssid>`. Signal handles `NN%` and `-NN dBm`.
pub fn parse_wifi_output(output: &str) -> WifiMetadata {
    let mut meta = WifiMetadata::default();

    for line in output.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Connected to ") {
            if meta.bssid.is_none() {
                let token = rest.split_whitespace().next().unwrap_or("");
                if looks_like_mac(token) {
                    meta.bssid = Some(token.to_string());
                }
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim().to_lowercase().as_str() {
            "ssid" if meta.ssid.is_none() => meta.ssid = Some(value.to_string()),
            "signal" if meta.signal_pct.is_none() => meta.signal_pct = parse_signal(value),
            "bssid" if meta.bssid.is_none() => {
                if looks_like_mac(value) {
                    meta.bssid = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    meta
}

fn parse_signal(value: &str) -> Option<u8> {
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<u8>().ok().map(|p| p.min(100));
    }
    if let Some(dbm_str) = value.strip_suffix("dBm") {
        let dbm = dbm_str.trim().parse::<i32>().ok()?;
        return Some(dbm_to_quality(dbm));
    }
    None
}

/// Map received power onto the 0-100 quality scale: -100 dBm and below
/// is 0, -50 dBm and above is 100, linear in between.
fn dbm_to_quality(dbm: i32) -> u8 {
    (2 * (dbm + 100)).clamp(0, 100) as u8
}

fn looks_like_mac(token: &str) -> bool {
    token.len() >= 11 && token.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '-')
}
