//! Network interface detection and selection

use anyhow::{Result, anyhow};
use pnet::datalink;
use pnet::util::MacAddr;
use std::net::{IpAddr, Ipv4Addr};

use crate::models::InterfaceInfo;

const VIRTUAL_ADAPTER_PATTERNS: &[&str] = &[
    "hyper-v",
    "vmware",
    "virtualbox",
    "docker",
    "vethernet",
    "wsl",
    "veth",
    "br-",
];

fn is_virtual_adapter_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIRTUAL_ADAPTER_PATTERNS.iter().any(|p| lower.contains(p))
}

fn is_link_local(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 169 && octets[1] == 254
}

/// Usable IPv4 candidates across all adapters, best first
fn collect_candidates(pnet_interfaces: &[datalink::NetworkInterface]) -> Vec<InterfaceInfo> {
    let mut candidates = Vec::new();

    for pnet_if in pnet_interfaces {
        if pnet_if.is_loopback() || !pnet_if.is_up() {
            continue;
        }

        let mac = match pnet_if.mac {
            Some(m) if m != MacAddr::zero() => m,
            _ => continue,
        };

        if is_virtual_adapter_name(&pnet_if.name) {
            crate::log_debug!("Skipping virtual adapter: {}", pnet_if.name);
            continue;
        }

        for ip_network in &pnet_if.ips {
            let IpAddr::V4(ipv4) = ip_network.ip() else {
                continue;
            };
            if ipv4.is_unspecified() || ip_network.prefix() == 0 || is_link_local(&ipv4) {
                continue;
            }

            candidates.push(InterfaceInfo {
                name: pnet_if.name.clone(),
                ip: ipv4,
                mac,
                prefix_len: ip_network.prefix(),
                pnet_interface: pnet_if.clone(),
            });
        }
    }

    candidates.sort_by_key(|c| std::cmp::Reverse(interface_score(&c.ip)));
    candidates
}

/// Picks the best IPv4 interface for sweeping the home network
pub fn find_valid_interface() -> Result<InterfaceInfo> {
    let pnet_interfaces = datalink::interfaces();
    crate::log_debug!("Inspecting {} network interfaces", pnet_interfaces.len());

    if let Some(best) = collect_candidates(&pnet_interfaces).into_iter().next() {
        crate::log_info!(
            "Selected interface: {} (IP: {}/{}, MAC: {})",
            best.name,
            best.ip,
            best.prefix_len,
            best.mac
        );
        return Ok(best);
    }

    for pnet_if in &pnet_interfaces {
        crate::log_warn!(
            "  - {} (loopback: {}, up: {}, mac: {:?}, ips: {:?})",
            pnet_if.name,
            pnet_if.is_loopback(),
            pnet_if.is_up(),
            pnet_if.mac,
            pnet_if.ips
        );
    }

    Err(anyhow!(
        "No valid IPv4 network interface found.\n\
         Ensure you have an active network connection."
    ))
}

/// Finds a usable interface by its exact name
pub fn find_interface_by_name(name: &str) -> Result<InterfaceInfo> {
    collect_candidates(&datalink::interfaces())
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            anyhow!(
                "Interface '{}' not found or has no usable IPv4 address. Available: {}",
                name,
                list_valid_interfaces().join(", ")
            )
        })
}

/// Valid interface names in priority order
pub fn list_valid_interfaces() -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for candidate in collect_candidates(&datalink::interfaces()) {
        if !names.contains(&candidate.name) {
            names.push(candidate.name);
        }
    }
    names
}

/// Scores an address for interface selection; home LAN ranges win
pub fn interface_score(ip: &Ipv4Addr) -> u32 {
    let octets = ip.octets();
    match octets[0] {
        192 if octets[1] == 168 => 100,
        10 => 90,
        172 if (16..=31).contains(&octets[1]) => 50,
        _ => 70,
    }
}
