//! The sampling loop: one telemetry snapshot per period.
//!
//! Each tick re-resolves the active interface from a fresh enumeration,
//! computes throughput, resolves addresses, probes reachability, reads
//! wireless metadata where applicable, and publishes one immutable
//! [`TelemetrySnapshot`]. Ticks never overlap; a completed kill-switch
//! toggle (or a manual refresh) wakes the loop out of band through a
//! shared [`Notify`] so staleness stays bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::constants::{ACTIVITY_THRESHOLD_BYTES, UNKNOWN};
use crate::models::{
    Activity, AdapterSummary, MediaType, ReachabilityResult, TelemetrySnapshot,
};
use crate::monitor::interfaces::{select_active, InterfaceSource};
use crate::monitor::rates::RateTracker;
use crate::probe::ReachabilityProbe;
use crate::public_ip::AddressSource;
use crate::wifi::WifiStatusReader;

/// Owns every collector the loop drives and the rate-tracker state tied
/// to the current active interface.
pub struct Engine {
    source: Box<dyn InterfaceSource>,
    probe: ReachabilityProbe,
    probe_target: String,
    resolver: Arc<dyn AddressSource>,
    wifi: WifiStatusReader,
    /// Rate baseline keyed by interface identity; dropped when the
    /// active interface changes so a new interface starts from zero
    /// instead of a boot-total delta.
    tracker: Option<(String, RateTracker)>,
    refresh: Arc<Notify>,
    period: Duration,
}

impl Engine {
    pub fn new(
        source: Box<dyn InterfaceSource>,
        probe: ReachabilityProbe,
        probe_target: String,
        resolver: Arc<dyn AddressSource>,
        refresh: Arc<Notify>,
        period: Duration,
    ) -> Self {
        Self {
            source,
            probe,
            probe_target,
            resolver,
            wifi: WifiStatusReader::new(),
            tracker: None,
            refresh,
            period,
        }
    }

    /// Produce one snapshot. Infallible by design: every external
    /// collaborator degrades to its fallback value inside its own
    /// component, and no active interface is a first-class offline
    /// snapshot rather than an error.
    pub async fn tick(&mut self) -> TelemetrySnapshot {
        let interfaces = self.source.list();

        let Some(active) = select_active(&interfaces).cloned() else {
            // Explicit offline state; the stale baseline must not
            // survive into whatever interface appears next.
            self.tracker = None;
            return TelemetrySnapshot::offline();
        };

        let (rx_rate, tx_rate) = match &mut self.tracker {
            Some((name, tracker)) if *name == active.name => {
                tracker.update(active.bytes_received, active.bytes_sent)
            }
            Some((name, tracker)) => {
                // Identity changed: re-seed against the new interface's
                // counters instead of diffing across interfaces.
                *name = active.name.clone();
                tracker.reset(active.bytes_received, active.bytes_sent);
                (0.0, 0.0)
            }
            None => {
                self.tracker = Some((
                    active.name.clone(),
                    RateTracker::seeded(active.bytes_received, active.bytes_sent),
                ));
                (0.0, 0.0)
            }
        };

        let public_ip = self
            .resolver
            .resolve_public()
            .await
            .unwrap_or_else(|| UNKNOWN.to_string());

        let reachability = {
            let probe = self.probe.clone();
            let target = self.probe_target.clone();
            let attempts = probe.sample_count();
            let bound = probe.burst_bound();
            // The burst runs on a blocking worker under a hard outer
            // timeout: ping's own reply deadline is advisory, and a
            // hung subprocess must not stall the loop. On elapse the
            // worker is abandoned and the tick degrades to offline.
            let burst = tokio::task::spawn_blocking(move || probe.probe(&target));
            match tokio::time::timeout(bound, burst).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(error = %e, "probe burst aborted");
                    ReachabilityResult::offline(attempts)
                }
                Err(_) => {
                    warn!(bound_ms = bound.as_millis() as u64, "probe burst exceeded its bound");
                    ReachabilityResult::offline(attempts)
                }
            }
        };

        let wifi = if active.media == MediaType::Wireless {
            Some(self.wifi.read(&active.name))
        } else {
            None
        };

        TelemetrySnapshot {
            captured_at: chrono::Local::now(),
            adapter: Some(AdapterSummary {
                name: active.name.clone(),
                media: active.media,
                is_up: active.is_up,
            }),
            local_ip: active.ip.local_display(),
            gateway: active.ip.gateway_display(),
            dns: active.ip.dns_display(),
            public_ip,
            rx_rate,
            tx_rate,
            reachability,
            wifi,
            activity: Activity::classify(rx_rate, tx_rate, ACTIVITY_THRESHOLD_BYTES),
        }
    }

    /// Drive the loop forever, handing each snapshot to `publish`.
    ///
    /// The interval delays missed ticks instead of bursting, and the
    /// tick itself is awaited to completion before the next fire, so
    /// two ticks can never race the rate-tracker baseline.
    pub async fn run(mut self, mut publish: impl FnMut(&TelemetrySnapshot)) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let refresh = self.refresh.clone();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = refresh.notified() => {
                    debug!("out-of-band refresh requested");
                }
            }
            let snapshot = self.tick().await;
            debug!(
                online = snapshot.is_online(),
                adapter = snapshot.adapter.as_ref().map(|a| a.name.as_str()),
                "tick complete"
            );
            publish(&snapshot);
        }
    }
}
