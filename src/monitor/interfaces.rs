//! Interface enumeration and active-interface selection.
//!
//! Enumeration is a consumed OS capability behind [`InterfaceSource`] so
//! the engine and the toggle controller can be exercised against fake
//! interface lists. The production source combines live byte counters and
//! addresses from `sysinfo` with best-effort reads of `/sys/class/net`
//! (operational state, link speed, medium) and the system's routing and
//! resolver files. Every OS read degrades to a default rather than
//! failing the tick.

use std::net::Ipv4Addr;
use std::path::Path;

use sysinfo::Networks;

use crate::constants::EXCLUDED_DESCRIPTION_TOKENS;
use crate::models::{InterfaceDescriptor, IpConfig, MediaType};

/// Source of the OS-reported interface list. Re-queried on every tick,
/// never cached: adapters can appear, disappear, or change status between
/// ticks, notably right after a toggle operation.
pub trait InterfaceSource: Send {
    fn list(&mut self) -> Vec<InterfaceDescriptor>;
}

/// Production interface source.
pub struct SysNetSource {
    networks: Networks,
}

impl SysNetSource {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl InterfaceSource for SysNetSource {
    fn list(&mut self) -> Vec<InterfaceDescriptor> {
        self.networks.refresh_list();

        let gateway = read_default_gateway();
        let dns = read_dns_servers();

        let mut interfaces: Vec<InterfaceDescriptor> = self
            .networks
            .iter()
            .map(|(name, data)| {
                let local = data.ip_networks().iter().find_map(|net| match net.addr {
                    std::net::IpAddr::V4(v4) => Some(v4),
                    std::net::IpAddr::V6(_) => None,
                });

                let media = read_media_type(name);
                // operstate is authoritative where available; otherwise an
                // addressed interface is assumed up.
                let is_up = read_operstate(name)
                    .map(|s| s == "up")
                    .unwrap_or(local.is_some());

                let mac = {
                    let addr = data.mac_address();
                    if addr == sysinfo::MacAddr::UNSPECIFIED {
                        None
                    } else {
                        Some(addr.to_string())
                    }
                };

                let iface_gateway = gateway
                    .as_ref()
                    .filter(|(via, _)| via == name)
                    .map(|(_, addr)| *addr);

                InterfaceDescriptor {
                    name: name.clone(),
                    description: describe_interface(name, media),
                    media,
                    is_up,
                    link_speed_mbps: read_link_speed(name),
                    bytes_received: data.total_received(),
                    bytes_sent: data.total_transmitted(),
                    mac,
                    ip: IpConfig {
                        local,
                        gateway: iface_gateway,
                        dns: dns.clone(),
                    },
                }
            })
            .collect();

        // sysinfo iterates a map; sort for a stable enumeration order so
        // selection ties resolve the same way every tick.
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }
}

// ── Selection policy ──────────────────────────────────────────────

/// Whether an adapter description excludes it from selection
/// (virtual adapters and the loopback device).
pub fn is_excluded(description: &str) -> bool {
    let lower = description.to_lowercase();
    EXCLUDED_DESCRIPTION_TOKENS
        .iter()
        .any(|token| lower.contains(token))
}

/// Choose the single active interface: operationally up, not excluded,
/// highest link speed. Ties resolve to the earlier entry. Returns None
/// when nothing qualifies.
pub fn select_active(interfaces: &[InterfaceDescriptor]) -> Option<&InterfaceDescriptor> {
    let mut best: Option<&InterfaceDescriptor> = None;
    for iface in interfaces {
        if !iface.is_up || is_excluded(&iface.description) {
            continue;
        }
        let speed = iface.link_speed_mbps.unwrap_or(0);
        match best {
            // Strictly greater, so the first of equals wins.
            Some(current) if speed <= current.link_speed_mbps.unwrap_or(0) => {}
            _ => best = Some(iface),
        }
    }
    best
}

/// First non-excluded adapter from the full list, including ones that are
/// administratively down. Used by the kill switch to find something to
/// re-enable when its remembered adapter name was lost.
pub fn first_toggle_candidate(interfaces: &[InterfaceDescriptor]) -> Option<&InterfaceDescriptor> {
    interfaces.iter().find(|i| !is_excluded(&i.description))
}

// ── OS readers (best-effort, default on failure) ──────────────────

/// Human description synthesized from what the OS exposes. Virtual and
/// loopback devices are named as such so the selection filter can match
/// them the same way it matches vendor descriptions elsewhere.
pub fn describe_interface(name: &str, media: MediaType) -> String {
    if name == "lo" || name.starts_with("lo0") {
        return format!("{} (loopback)", name);
    }
    if is_virtual_name(name) {
        return format!("{} (virtual)", name);
    }
    format!("{} ({})", name, media.label())
}

fn is_virtual_name(name: &str) -> bool {
    const VIRTUAL_PREFIXES: &[&str] = &[
        "veth", "virbr", "vnet", "docker", "br-", "tun", "tap", "wg", "zt",
    ];
    VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn read_media_type(name: &str) -> MediaType {
    let base = Path::new("/sys/class/net").join(name);
    if base.join("wireless").is_dir() {
        return MediaType::Wireless;
    }
    // ARPHRD_ETHER == 1, ARPHRD_LOOPBACK == 772
    match std::fs::read_to_string(base.join("type"))
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    {
        Some(1) => MediaType::Wired,
        _ => MediaType::Other,
    }
}

fn read_operstate(name: &str) -> Option<String> {
    std::fs::read_to_string(Path::new("/sys/class/net").join(name).join("operstate"))
        .ok()
        .map(|s| s.trim().to_string())
}

fn read_link_speed(name: &str) -> Option<u64> {
    // Reports -1 for media without a fixed rate (and errors on some
    // wireless drivers); both read as None.
    std::fs::read_to_string(Path::new("/sys/class/net").join(name).join("speed"))
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
}

fn read_default_gateway() -> Option<(String, Ipv4Addr)> {
    let content = std::fs::read_to_string("/proc/net/route").ok()?;
    parse_default_gateway(&content)
}

fn read_dns_servers() -> Vec<Ipv4Addr> {
    match std::fs::read_to_string("/etc/resolv.conf") {
        Ok(content) => parse_resolv_conf(&content),
        Err(_) => Vec::new(),
    }
}

/// Parse `/proc/net/route` for the default route. Columns are
/// `Iface Destination Gateway Flags ...` with addresses as little-endian
/// hex; the default route has destination 00000000.
pub fn parse_default_gateway(content: &str) -> Option<(String, Ipv4Addr)> {
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[1] != "00000000" {
            continue;
        }
        let Ok(raw) = u32::from_str_radix(fields[2], 16) else {
            continue;
        };
        let gateway = Ipv4Addr::from(raw.to_le_bytes());
        if !gateway.is_unspecified() {
            return Some((fields[0].to_string(), gateway));
        }
    }
    None
}

/// Extract IPv4 `nameserver` entries from resolv.conf text.
pub fn parse_resolv_conf(content: &str) -> Vec<Ipv4Addr> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let value = line.strip_prefix("nameserver")?.trim();
            value.parse::<Ipv4Addr>().ok()
        })
        .collect()
}
