//! Shared display formatting for the CLI front-end.

use std::time::Duration;

use crate::models::TelemetrySnapshot;

const MB: f64 = 1024.0 * 1024.0;

/// Format a byte rate as MB/s with two decimals.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{:.2} MB/s", bytes_per_sec / MB)
}

/// Format an average latency, or "N/A" when the probe produced no data.
pub fn format_ping(avg_latency: Option<Duration>) -> String {
    match avg_latency {
        Some(rtt) => format!("{} ms", rtt.as_millis()),
        None => "N/A".to_string(),
    }
}

/// Render one snapshot as a single status line.
pub fn render_status_line(snapshot: &TelemetrySnapshot) -> String {
    let adapter = snapshot
        .adapter
        .as_ref()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "none".to_string());
    let internet = if snapshot.is_online() { "online" } else { "offline" };

    let mut line = format!(
        "{} [{}] | v {} ^ {} | ping {} | loss {}% | {} | {} | ip {} gw {} dns {} public {}",
        snapshot.captured_at.format("%H:%M:%S"),
        adapter,
        format_rate(snapshot.rx_rate),
        format_rate(snapshot.tx_rate),
        format_ping(snapshot.reachability.avg_latency),
        snapshot.reachability.loss_pct,
        internet,
        snapshot.activity.label(),
        snapshot.local_ip,
        snapshot.gateway,
        snapshot.dns,
        snapshot.public_ip,
    );

    if let Some(wifi) = &snapshot.wifi {
        line.push_str(&format!(
            " | ssid {} signal {} bssid {}",
            wifi.ssid_display(),
            wifi.signal_display(),
            wifi.bssid_display()
        ));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_rate ───────────────────────────────────────────────

    #[test]
    fn rate_formats_in_megabytes() {
        assert_eq!(format_rate(2.0 * MB), "2.00 MB/s");
        assert_eq!(format_rate(0.0), "0.00 MB/s");
        assert_eq!(format_rate(512.0 * 1024.0), "0.50 MB/s");
    }

    // ── format_ping ───────────────────────────────────────────────

    #[test]
    fn ping_formats_milliseconds() {
        assert_eq!(format_ping(Some(Duration::from_millis(12))), "12 ms");
    }

    #[test]
    fn ping_without_data_is_na() {
        assert_eq!(format_ping(None), "N/A");
    }

    // ── render_status_line ────────────────────────────────────────

    #[test]
    fn offline_snapshot_renders_as_offline() {
        let line = render_status_line(&TelemetrySnapshot::offline());
        assert!(line.contains("[none]"));
        assert!(line.contains("offline"));
        assert!(line.contains("ping N/A"));
        assert!(line.contains("loss 100%"));
        assert!(line.contains("ip unknown"));
        // No wifi block without a wireless adapter.
        assert!(!line.contains("ssid"));
    }

    #[test]
    fn wireless_snapshot_appends_wifi_block() {
        let mut snapshot = TelemetrySnapshot::offline();
        snapshot.wifi = Some(crate::models::WifiMetadata {
            ssid: Some("HomeNet".to_string()),
            signal_pct: Some(72),
            bssid: None,
        });
        let line = render_status_line(&snapshot);
        assert!(line.contains("ssid HomeNet"));
        assert!(line.contains("signal 72%"));
        assert!(line.contains("bssid unknown"));
    }
}
