//! Subnet calculation for the ARP sweep

use anyhow::{Context, Result};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

use crate::config::max_scan_hosts;
use crate::models::InterfaceInfo;

/// Checks if an IP address is the network or broadcast address of `subnet`
pub fn is_special_address(ip: Ipv4Addr, subnet: &Ipv4Network) -> bool {
    ip == subnet.network() || ip == subnet.broadcast()
}

/// Checks if a target IP is on the same L2 segment as the local interface
pub fn is_local_subnet(target_ip: Ipv4Addr, local_interface: &InterfaceInfo) -> bool {
    Ipv4Network::new(local_interface.ip, local_interface.prefix_len)
        .map(|network| network.contains(target_ip))
        .unwrap_or(false)
}

/// Subnet of the interface and the host addresses to sweep.
///
/// Network and broadcast addresses are excluded. Large subnets are cut to a
/// window of `max_scan_hosts()` addresses centred on the local address.
pub fn calculate_subnet_ips(interface: &InterfaceInfo) -> Result<(Ipv4Network, Vec<Ipv4Addr>)> {
    calculate_subnet_ips_capped(interface, max_scan_hosts())
}

pub(crate) fn calculate_subnet_ips_capped(
    interface: &InterfaceInfo,
    cap: usize,
) -> Result<(Ipv4Network, Vec<Ipv4Addr>)> {
    let network = Ipv4Network::new(interface.ip, interface.prefix_len)
        .context("Failed to create network from interface IP and prefix")?;
    let subnet = Ipv4Network::new(network.network(), interface.prefix_len)
        .context("Failed to create subnet network")?;

    let hosts: Vec<Ipv4Addr> = subnet
        .iter()
        .filter(|ip| !is_special_address(*ip, &subnet))
        .collect();

    let ips = if hosts.len() > cap {
        crate::log_warn!(
            "Subnet {} has {} hosts, limiting sweep to {} hosts",
            subnet,
            hosts.len(),
            cap
        );
        let center = hosts
            .iter()
            .position(|ip| *ip == interface.ip)
            .unwrap_or(hosts.len() / 2);
        let start = center
            .saturating_sub(cap / 2)
            .min(hosts.len().saturating_sub(cap));

        hosts.into_iter().skip(start).take(cap).collect()
    } else {
        hosts
    };

    crate::log_debug!("Subnet {} yields {} sweep targets", subnet, ips.len());

    Ok((subnet, ips))
}

#[cfg(test)]
#[path = "subnet_tests.rs"]
mod subnet_tests;
