use std::path::Path;

use serde::Deserialize;

use crate::constants::*;

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/netpulse/config.toml, then by CLI
/// flags on top.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sampling period in milliseconds.
    pub tick_interval_ms: u64,
    /// Host probed for reachability.
    pub probe_target: String,
    /// Echo requests per probe burst.
    pub probe_count: u32,
    /// Per-echo timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Delay between echoes in milliseconds.
    pub probe_spacing_ms: u64,
    /// Public IP echo endpoint.
    pub ip_echo_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_MS,
            probe_target: DEFAULT_PROBE_TARGET.to_string(),
            probe_count: PROBE_SAMPLE_COUNT,
            probe_timeout_ms: PROBE_TIMEOUT_MS,
            probe_spacing_ms: PROBE_SPACING_MS,
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional — missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    tick_interval_ms: Option<u64>,
    probe_target: Option<String>,
    probe_count: Option<u32>,
    probe_timeout_ms: Option<u64>,
    probe_spacing_ms: Option<u64>,
    ip_echo_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/netpulse/config.toml, falling back to
    /// defaults for any missing fields. If the file doesn't exist,
    /// returns pure defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return config, // No config file — use defaults
        };

        let file_config: FileConfig = match toml::from_str(&content) {
            Ok(fc) => fc,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to parse {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                return config;
            }
        };

        // Merge file values over defaults
        if let Some(v) = file_config.tick_interval_ms {
            config.tick_interval_ms = v.max(MIN_TICK_MS);
        }
        if let Some(v) = file_config.probe_target {
            if !v.is_empty() {
                config.probe_target = v;
            }
        }
        if let Some(v) = file_config.probe_count {
            config.probe_count = v.clamp(1, 100);
        }
        if let Some(v) = file_config.probe_timeout_ms {
            config.probe_timeout_ms = v.max(50);
        }
        if let Some(v) = file_config.probe_spacing_ms {
            config.probe_spacing_ms = v;
        }
        if let Some(v) = file_config.ip_echo_url {
            if !v.is_empty() {
                config.ip_echo_url = v;
            }
        }

        config
    }
}
