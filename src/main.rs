//! # Netpulse - Network Telemetry Daemon
//!
//! Samples the host's active network interface once a second and derives
//! throughput, internet reachability, packet loss, and wireless metadata.
//! Also carries an internet kill switch that administratively disables
//! or re-enables the active adapter.

mod config;
pub mod constants;
mod engine;
mod models;
mod monitor;
mod probe;
mod public_ip;
mod toggle;
mod utils;
mod wifi;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use engine::Engine;
use monitor::interfaces::SysNetSource;
use probe::{ReachabilityProbe, SystemPing};
use public_ip::PublicIpClient;
use toggle::{OsAdminLink, ToggleController};

/// Netpulse - network telemetry with a kill switch
#[derive(Parser, Debug)]
#[command(name = "netpulse", version, about = "Network telemetry daemon with a kill-switch toggle")]
struct Cli {
    /// Sampling period in milliseconds
    #[arg(long, short = 'r')]
    refresh_rate: Option<u64>,

    /// Reachability probe target
    #[arg(long, value_name = "HOST")]
    probe_target: Option<String>,

    /// Echo requests per probe burst
    #[arg(long, value_name = "N")]
    probe_count: Option<u32>,

    /// Public IP echo endpoint
    #[arg(long, value_name = "URL")]
    ip_echo_url: Option<String>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Flip the internet kill switch once and exit
    Toggle {
        /// Desired admin state for the adapter
        #[arg(value_enum)]
        state: SwitchState,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SwitchState {
    /// Re-enable the adapter
    On,
    /// Disable the active adapter
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load and apply CLI overrides to config
    let mut config = Config::load();
    if let Some(rate) = cli.refresh_rate {
        config.tick_interval_ms = rate.max(constants::MIN_TICK_MS);
    }
    if let Some(target) = cli.probe_target {
        config.probe_target = target;
    }
    if let Some(count) = cli.probe_count {
        config.probe_count = count.clamp(1, 100);
    }
    if let Some(url) = cli.ip_echo_url {
        config.ip_echo_url = url;
    }

    match cli.command {
        Some(CliCommand::Toggle { state }) => run_toggle(state).await,
        None => run_sampling(&config).await,
    }
}

/// One-shot kill switch. `on` with a fresh controller exercises the
/// lost-state fallback and re-enables the first real adapter.
async fn run_toggle(state: SwitchState) -> Result<()> {
    let controller = ToggleController::new(
        Box::new(SysNetSource::new()),
        Arc::new(OsAdminLink),
        Arc::new(Notify::new()),
    );

    let result = match state {
        SwitchState::Off => controller.disable().await,
        SwitchState::On => controller.enable().await,
    };

    match result {
        Ok(()) => {
            println!("kill switch: {}", controller.state().label().to_lowercase());
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}

async fn run_sampling(config: &Config) -> Result<()> {
    let refresh = Arc::new(Notify::new());

    let probe = ReachabilityProbe::with_timing(
        Arc::new(SystemPing),
        config.probe_count,
        Duration::from_millis(config.probe_timeout_ms),
        Duration::from_millis(config.probe_spacing_ms),
    );

    let engine = Engine::new(
        Box::new(SysNetSource::new()),
        probe,
        config.probe_target.clone(),
        Arc::new(PublicIpClient::new(&config.ip_echo_url)),
        refresh.clone(),
        Duration::from_millis(config.tick_interval_ms),
    );

    // SIGHUP requests an immediate out-of-band snapshot, the same
    // pathway a completed kill-switch toggle uses.
    #[cfg(unix)]
    {
        let refresh = refresh.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let Ok(mut hup) = signal(SignalKind::hangup()) else {
                return;
            };
            while hup.recv().await.is_some() {
                refresh.notify_one();
            }
        });
    }

    info!(
        period_ms = config.tick_interval_ms,
        target = %config.probe_target,
        "sampling loop started"
    );

    engine
        .run(|snapshot| println!("{}", utils::render_status_line(snapshot)))
        .await;

    Ok(())
}
