use std::net::Ipv4Addr;

use crate::constants::UNKNOWN;

/// Physical medium of a network adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Wired,
    Wireless,
    Other,
}

impl MediaType {
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Wired => "Ethernet",
            MediaType::Wireless => "Wireless",
            MediaType::Other => "Other",
        }
    }
}

/// One OS-reported network adapter, captured fresh on every sampling tick.
///
/// Never cached across ticks: an adapter that disappears or changes
/// operational status must be detected within one period.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct InterfaceDescriptor {
    /// OS identifier (e.g. "eth0", "Wi-Fi").
    pub name: String,
    /// Human-readable adapter description.
    pub description: String,
    pub media: MediaType,
    /// Operational status (link up and running).
    pub is_up: bool,
    /// Reported link speed in Mbit/s, if the OS exposes it.
    pub link_speed_mbps: Option<u64>,
    /// Cumulative bytes received since adapter start.
    pub bytes_received: u64,
    /// Cumulative bytes sent since adapter start.
    pub bytes_sent: u64,
    pub mac: Option<String>,
    pub ip: IpConfig,
}

/// IPv4 configuration of one adapter. Fields are independently optional;
/// display helpers fall back to "unknown".
#[derive(Debug, Clone, Default)]
pub struct IpConfig {
    /// First IPv4 unicast address.
    pub local: Option<Ipv4Addr>,
    /// Default gateway.
    pub gateway: Option<Ipv4Addr>,
    /// Configured DNS resolvers.
    pub dns: Vec<Ipv4Addr>,
}

impl IpConfig {
    pub fn local_display(&self) -> String {
        self.local
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn gateway_display(&self) -> String {
        self.gateway
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// All resolvers joined with ", ", or "unknown" when none are configured.
    pub fn dns_display(&self) -> String {
        if self.dns.is_empty() {
            UNKNOWN.to_string()
        } else {
            self.dns
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
