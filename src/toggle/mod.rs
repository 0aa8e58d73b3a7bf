//! Internet kill switch: a race-free enable/disable state machine over
//! the OS adapter admin state.
//!
//! State flow: Enabled → Disabling → Disabled → Enabling → Enabled.
//! A single in-flight guard, claimed with one compare-and-swap, rejects
//! any toggle requested while another is running; the caller reverts its
//! requested UI state instead of queueing. The admin command's output is
//! diagnostic only: the controller moves forward optimistically and the
//! next telemetry tick reveals the true adapter state.

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::constants::{DISABLE_SETTLE_MS, ENABLE_SETTLE_MS};
use crate::monitor::interfaces::{first_toggle_candidate, select_active, InterfaceSource};

/// Kill-switch lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// Adapter under normal operation.
    Enabled,
    /// Admin-disable issued, waiting for OS state to settle.
    Disabling,
    /// Adapter administratively down.
    Disabled,
    /// Admin-enable issued, waiting for OS state to settle.
    Enabling,
}

impl ToggleState {
    pub fn label(&self) -> &'static str {
        match self {
            ToggleState::Enabled => "Enabled",
            ToggleState::Disabling => "Disabling",
            ToggleState::Disabled => "Disabled",
            ToggleState::Enabling => "Enabling",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToggleError {
    /// Another toggle operation is in flight; the request is rejected,
    /// never queued.
    #[error("a toggle operation is already in flight")]
    Busy,
    #[error("no active network adapter found")]
    NoActiveInterface,
    #[error("no network adapter found to re-enable")]
    NoAdapter,
}

/// Mutates OS-level adapter admin state. Consumed capability; fakes
/// stand in for it in tests.
pub trait AdminLink: Send + Sync {
    /// Set the adapter's admin state, returning combined stdout/stderr
    /// as a diagnostic string.
    fn set_enabled(&self, name: &str, enabled: bool) -> std::io::Result<String>;
}

/// Production admin link through the platform's interface tool.
pub struct OsAdminLink;

impl AdminLink for OsAdminLink {
    fn set_enabled(&self, name: &str, enabled: bool) -> std::io::Result<String> {
        #[cfg(windows)]
        let output = Command::new("netsh")
            .args(["interface", "set", "interface"])
            .arg(format!("name=\"{}\"", name))
            .arg(format!(
                "admin={}",
                if enabled { "ENABLED" } else { "DISABLED" }
            ))
            .output()?;

        #[cfg(not(windows))]
        let output = Command::new("ip")
            .args(["link", "set", "dev", name, if enabled { "up" } else { "down" }])
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Ok(stderr.into_owned())
        }
    }
}

/// The in-flight guard. `try_begin` claims it with a single
/// compare-and-swap; the returned permit releases it on drop, so the
/// flag clears on every exit path, panics included.
struct OpGuard {
    busy: AtomicBool,
}

impl OpGuard {
    fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    fn try_begin(&self) -> Option<OpPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(OpPermit { guard: self })
    }
}

struct OpPermit<'a> {
    guard: &'a OpGuard,
}

impl Drop for OpPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

struct Inner {
    state: ToggleState,
    /// Adapter name captured at disable time. Owned exclusively here;
    /// cleared exactly when the adapter is confirmed re-enabled.
    remembered: Option<String>,
}

/// Drives the kill switch. Shared across tasks behind an `Arc`.
pub struct ToggleController {
    inner: Mutex<Inner>,
    guard: OpGuard,
    link: Arc<dyn AdminLink>,
    source: Mutex<Box<dyn InterfaceSource>>,
    /// Pinged after each completed transition so the sampling loop can
    /// refresh out of band instead of waiting for the next period.
    refresh: Arc<Notify>,
}

impl ToggleController {
    pub fn new(
        source: Box<dyn InterfaceSource>,
        link: Arc<dyn AdminLink>,
        refresh: Arc<Notify>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ToggleState::Enabled,
                remembered: None,
            }),
            guard: OpGuard::new(),
            link,
            source: Mutex::new(source),
            refresh,
        }
    }

    pub fn state(&self) -> ToggleState {
        self.inner.lock().unwrap().state
    }

    #[allow(dead_code)]
    pub fn remembered_adapter(&self) -> Option<String> {
        self.inner.lock().unwrap().remembered.clone()
    }

    /// Disable the currently active adapter.
    ///
    /// Captures the adapter name for the later re-enable, issues the
    /// admin command, waits the settle delay, and requests a telemetry
    /// refresh. Rejected with [`ToggleError::Busy`] while another toggle
    /// runs; fails with [`ToggleError::NoActiveInterface`] (state stays
    /// Enabled) when nothing is active.
    pub async fn disable(&self) -> Result<(), ToggleError> {
        let _permit = self.guard.try_begin().ok_or(ToggleError::Busy)?;

        let name = {
            let list = self.source.lock().unwrap().list();
            select_active(&list)
                .map(|i| i.name.clone())
                .ok_or(ToggleError::NoActiveInterface)?
        };

        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = ToggleState::Disabling;
            inner.remembered = Some(name.clone());
        }

        self.run_admin(&name, false);

        tokio::time::sleep(Duration::from_millis(DISABLE_SETTLE_MS)).await;
        self.inner.lock().unwrap().state = ToggleState::Disabled;
        info!(adapter = %name, "kill switch engaged");
        self.refresh.notify_one();
        Ok(())
    }

    /// Re-enable the remembered adapter.
    ///
    /// Falls back to the first non-virtual, non-loopback adapter from
    /// the full interface list (including down adapters) when the
    /// remembered name was lost. Clears the remembered name once the
    /// transition completes.
    pub async fn enable(&self) -> Result<(), ToggleError> {
        let _permit = self.guard.try_begin().ok_or(ToggleError::Busy)?;

        let remembered = self.inner.lock().unwrap().remembered.clone();
        let name = match remembered {
            Some(name) => name,
            None => {
                let list = self.source.lock().unwrap().list();
                first_toggle_candidate(&list)
                    .map(|i| i.name.clone())
                    .ok_or(ToggleError::NoAdapter)?
            }
        };

        self.inner.lock().unwrap().state = ToggleState::Enabling;

        self.run_admin(&name, true);

        // Enabling takes longer to reflect in OS state than disabling.
        tokio::time::sleep(Duration::from_millis(ENABLE_SETTLE_MS)).await;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.remembered = None;
            inner.state = ToggleState::Enabled;
        }
        info!(adapter = %name, "kill switch released");
        self.refresh.notify_one();
        Ok(())
    }

    /// Issue the admin command. Its output is surfaced as a diagnostic
    /// and never blocks the transition; the next tick shows the truth.
    fn run_admin(&self, name: &str, enabled: bool) {
        let action = if enabled { "enable" } else { "disable" };
        match self.link.set_enabled(name, enabled) {
            Ok(diag) if !diag.trim().is_empty() => {
                info!(adapter = %name, action, diag = %diag.trim(), "admin command issued")
            }
            Ok(_) => info!(adapter = %name, action, "admin command issued"),
            Err(e) => warn!(adapter = %name, action, error = %e, "admin command failed to launch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InterfaceDescriptor, IpConfig, MediaType};

    fn iface(name: &str, up: bool, speed: Option<u64>) -> InterfaceDescriptor {
        InterfaceDescriptor {
            name: name.to_string(),
            description: format!("{} (Ethernet)", name),
            media: MediaType::Wired,
            is_up: up,
            link_speed_mbps: speed,
            bytes_received: 0,
            bytes_sent: 0,
            mac: None,
            ip: IpConfig::default(),
        }
    }

    /// Fixed interface list.
    struct StaticSource(Vec<InterfaceDescriptor>);

    impl InterfaceSource for StaticSource {
        fn list(&mut self) -> Vec<InterfaceDescriptor> {
            self.0.clone()
        }
    }

    /// Records every admin command issued.
    #[derive(Default)]
    struct RecordingLink {
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl AdminLink for RecordingLink {
        fn set_enabled(&self, name: &str, enabled: bool) -> std::io::Result<String> {
            self.calls.lock().unwrap().push((name.to_string(), enabled));
            Ok(String::new())
        }
    }

    fn controller_with(
        interfaces: Vec<InterfaceDescriptor>,
    ) -> (Arc<ToggleController>, Arc<RecordingLink>, Arc<Notify>) {
        let link = Arc::new(RecordingLink::default());
        let refresh = Arc::new(Notify::new());
        let controller = Arc::new(ToggleController::new(
            Box::new(StaticSource(interfaces)),
            link.clone(),
            refresh.clone(),
        ));
        (controller, link, refresh)
    }

    // ── transitions ───────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn disable_captures_active_adapter() {
        let (controller, link, _) = controller_with(vec![iface("eth0", true, Some(1000))]);

        controller.disable().await.unwrap();

        assert_eq!(controller.state(), ToggleState::Disabled);
        assert_eq!(controller.remembered_adapter().as_deref(), Some("eth0"));
        assert_eq!(
            *link.calls.lock().unwrap(),
            vec![("eth0".to_string(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disable_without_active_adapter_stays_enabled() {
        let (controller, link, _) = controller_with(vec![iface("eth0", false, Some(1000))]);

        let err = controller.disable().await.unwrap_err();

        assert_eq!(err, ToggleError::NoActiveInterface);
        assert_eq!(controller.state(), ToggleState::Enabled);
        assert!(link.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_clears_remembered_adapter() {
        let (controller, link, _) = controller_with(vec![iface("eth0", true, Some(1000))]);

        controller.disable().await.unwrap();
        assert_eq!(controller.state(), ToggleState::Disabled);

        controller.enable().await.unwrap();

        assert_eq!(controller.state(), ToggleState::Enabled);
        assert!(controller.remembered_adapter().is_none());
        // Both commands hit the adapter that was active before disable.
        assert_eq!(
            *link.calls.lock().unwrap(),
            vec![("eth0".to_string(), false), ("eth0".to_string(), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enable_with_lost_state_falls_back_to_first_candidate() {
        // Down adapters are eligible for re-enable; loopback is not.
        let mut lo = iface("lo", true, None);
        lo.description = "lo (loopback)".to_string();
        let (controller, link, _) = controller_with(vec![
            lo,
            iface("eth1", false, Some(100)),
            iface("eth0", false, Some(1000)),
        ]);

        controller.enable().await.unwrap();

        assert_eq!(controller.state(), ToggleState::Enabled);
        assert_eq!(
            *link.calls.lock().unwrap(),
            vec![("eth1".to_string(), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enable_with_no_candidates_fails() {
        let (controller, _, _) = controller_with(Vec::new());
        assert_eq!(controller.enable().await.unwrap_err(), ToggleError::NoAdapter);
    }

    // ── in-flight guard ───────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn concurrent_disables_issue_exactly_one_command() {
        let (controller, link, _) = controller_with(vec![iface("eth0", true, Some(1000))]);

        let (first, second) = tokio::join!(controller.disable(), controller.disable());

        // Exactly one wins; the other is rejected immediately so its
        // requested UI state can revert.
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.contains(&Err(ToggleError::Busy)));
        assert_eq!(link.calls.lock().unwrap().len(), 1);
        assert_eq!(controller.state(), ToggleState::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_releases_after_failure() {
        let (controller, _, _) = controller_with(vec![iface("eth0", false, None)]);

        // First attempt fails (nothing active); the guard must release
        // so a later attempt is not spuriously Busy.
        assert_eq!(
            controller.disable().await.unwrap_err(),
            ToggleError::NoActiveInterface
        );
        assert_eq!(
            controller.disable().await.unwrap_err(),
            ToggleError::NoActiveInterface
        );
    }

    // ── refresh notification ──────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn completed_toggle_requests_refresh() {
        let (controller, _, refresh) = controller_with(vec![iface("eth0", true, Some(1000))]);

        controller.disable().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), refresh.notified())
            .await
            .expect("refresh notification after toggle");
    }

    #[test]
    fn state_labels() {
        assert_eq!(ToggleState::Enabled.label(), "Enabled");
        assert_eq!(ToggleState::Disabling.label(), "Disabling");
        assert_eq!(ToggleState::Disabled.label(), "Disabled");
        assert_eq!(ToggleState::Enabling.label(), "Enabling");
    }
}
