//! Throughput computation from cumulative byte counters.

use std::time::Instant;

use crate::constants::MIN_RATE_INTERVAL;

/// Turns successive cumulative (rx, tx) counter samples into
/// instantaneous rates in bytes/sec.
///
/// Owned by the sampling loop and tied to one interface's lifetime:
/// the loop re-seeds it whenever the active interface changes identity,
/// so the first sample on a new interface never produces a boot-total
/// delta.
#[derive(Debug)]
pub struct RateTracker {
    prev_rx: u64,
    prev_tx: u64,
    sampled_at: Instant,
}

impl RateTracker {
    /// Seed the baseline from an initial counter read. Rates are only
    /// meaningful from the next `update` onward.
    pub fn seeded(rx: u64, tx: u64) -> Self {
        Self {
            prev_rx: rx,
            prev_tx: tx,
            sampled_at: Instant::now(),
        }
    }

    /// Re-seed after the active interface changed identity.
    pub fn reset(&mut self, rx: u64, tx: u64) {
        self.prev_rx = rx;
        self.prev_tx = tx;
        self.sampled_at = Instant::now();
    }

    /// Compute (rx_rate, tx_rate) in bytes/sec against the stored
    /// baseline, then overwrite the baseline so the next call measures
    /// the next interval rather than a moving average.
    pub fn update(&mut self, rx: u64, tx: u64) -> (f64, f64) {
        self.update_at(Instant::now(), rx, tx)
    }

    fn update_at(&mut self, now: Instant, rx: u64, tx: u64) -> (f64, f64) {
        // Floor the interval: a manual refresh can land a tick almost
        // immediately after the previous one.
        let elapsed = now
            .saturating_duration_since(self.sampled_at)
            .max(MIN_RATE_INTERVAL)
            .as_secs_f64();

        // A counter decrease means the adapter was reset or wrapped;
        // the delta is indeterminate, not an error.
        let rx_rate = if rx >= self.prev_rx {
            (rx - self.prev_rx) as f64 / elapsed
        } else {
            0.0
        };
        let tx_rate = if tx >= self.prev_tx {
            (tx - self.prev_tx) as f64 / elapsed
        } else {
            0.0
        };

        self.prev_rx = rx;
        self.prev_tx = tx;
        self.sampled_at = now;

        (rx_rate, tx_rate)
    }
}
