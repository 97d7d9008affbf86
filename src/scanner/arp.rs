//! Active ARP sweep with adaptive timing

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use pnet::datalink::{self, Channel};
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{DeviceScanner, ScanFuture};
use crate::config::{
    arp_check_interval_ms, arp_idle_timeout_ms, arp_max_wait_ms, arp_phase_timeout,
    arp_receiver_deadline, arp_rounds,
};
use crate::models::{InterfaceInfo, ScanSnapshot, Sighting};
use crate::network::{
    calculate_subnet_ips, find_interface_by_name, find_valid_interface, is_special_address,
};

const BROADCAST_MAC: MacAddr = MacAddr(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);

const ETHERNET_HEADER_LEN: usize = 14;
const ARP_PACKET_LEN: usize = 28;

/// A reply received during the sweep
#[derive(Debug, Clone, Copy)]
pub struct ArpReply {
    pub mac: MacAddr,
    pub received_at: DateTime<Utc>,
}

/// Builds a broadcast "who-has" frame for `target_ip`
fn create_arp_request(
    source_mac: MacAddr,
    source_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; ETHERNET_HEADER_LEN + ARP_PACKET_LEN];

    {
        let mut ethernet_packet = MutableEthernetPacket::new(&mut buffer[..ETHERNET_HEADER_LEN])
            .ok_or_else(|| anyhow!("Failed to construct Ethernet packet buffer"))?;
        ethernet_packet.set_destination(BROADCAST_MAC);
        ethernet_packet.set_source(source_mac);
        ethernet_packet.set_ethertype(EtherTypes::Arp);
    }

    {
        let mut arp_packet = MutableArpPacket::new(&mut buffer[ETHERNET_HEADER_LEN..])
            .ok_or_else(|| anyhow!("Failed to construct ARP packet buffer"))?;
        arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp_packet.set_protocol_type(EtherTypes::Ipv4);
        arp_packet.set_hw_addr_len(6);
        arp_packet.set_proto_addr_len(4);
        arp_packet.set_operation(ArpOperations::Request);
        arp_packet.set_sender_hw_addr(source_mac);
        arp_packet.set_sender_proto_addr(source_ip);
        arp_packet.set_target_hw_addr(MacAddr::zero());
        arp_packet.set_target_proto_addr(target_ip);
    }

    Ok(buffer)
}

/// Extracts `(sender ip, sender mac)` from an Ethernet frame carrying an ARP reply
fn parse_arp_reply(frame: &[u8]) -> Option<(Ipv4Addr, MacAddr)> {
    let ethernet = EthernetPacket::new(frame)?;
    if ethernet.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp = ArpPacket::new(ethernet.payload())?;
    if arp.get_operation() != ArpOperations::Reply {
        return None;
    }
    Some((arp.get_sender_proto_addr(), arp.get_sender_hw_addr()))
}

/// Sweeps `target_ips` with ARP requests and collects replies.
///
/// Blocking: run it on a blocking thread. Each round blasts requests at the
/// addresses not yet answered, then waits until replies stop arriving for the
/// idle timeout or the round's maximum wait elapses.
pub fn active_arp_scan(
    interface: &InterfaceInfo,
    target_ips: &[Ipv4Addr],
    subnet: &Ipv4Network,
) -> Result<HashMap<Ipv4Addr, ArpReply>> {
    let rounds = arp_rounds();
    let max_wait_ms = arp_max_wait_ms();
    let max_wait = Duration::from_millis(max_wait_ms);
    let check_interval = Duration::from_millis(arp_check_interval_ms());
    let idle_timeout = Duration::from_millis(arp_idle_timeout_ms());

    crate::log_info!(
        "ARP sweep of {} hosts on {} ({} round(s))",
        target_ips.len(),
        subnet,
        rounds
    );

    let (mut tx, mut rx) = match datalink::channel(&interface.pnet_interface, Default::default()) {
        Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
        Ok(_) => return Err(anyhow!("Unsupported datalink channel type")),
        Err(e) => {
            let message = e.to_string();
            if message.contains("permission")
                || message.contains("Operation not permitted")
                || message.contains("Access")
                || message.contains("Npcap")
            {
                return Err(anyhow!(
                    "Failed to open {} for ARP scanning: raw socket access denied.\n\
                     Run as root (or grant CAP_NET_RAW) on Linux/macOS, or install Npcap \
                     and run as Administrator on Windows.\n\nOriginal error: {}",
                    interface.name,
                    e
                ));
            }
            return Err(anyhow!("Failed to open datalink channel: {}", e));
        }
    };

    let discovered: Arc<Mutex<HashMap<Ipv4Addr, ArpReply>>> = Arc::new(Mutex::new(HashMap::new()));
    let host_count = Arc::new(AtomicUsize::new(0));
    let sweep_start = Instant::now();

    let receiver_deadline = arp_receiver_deadline(max_wait_ms, rounds);

    let receiver = {
        let discovered = Arc::clone(&discovered);
        let host_count = Arc::clone(&host_count);
        let subnet = *subnet;

        std::thread::spawn(move || {
            let deadline = Instant::now() + receiver_deadline;

            while Instant::now() < deadline {
                let frame = match rx.next() {
                    Ok(frame) => frame,
                    Err(_) => {
                        std::thread::sleep(Duration::from_micros(50));
                        continue;
                    }
                };

                let Some((sender_ip, sender_mac)) = parse_arp_reply(frame) else {
                    continue;
                };
                if !subnet.contains(sender_ip) || is_special_address(sender_ip, &subnet) {
                    continue;
                }

                let Ok(mut map) = discovered.lock() else {
                    crate::log_warn!("ARP reply map lock poisoned; stopping receiver");
                    break;
                };
                if let Entry::Vacant(slot) = map.entry(sender_ip) {
                    slot.insert(ArpReply {
                        mac: sender_mac,
                        received_at: Utc::now(),
                    });
                    host_count.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
    };

    // Give the receiver time to start
    std::thread::sleep(Duration::from_millis(10));

    for round in 1..=rounds {
        let round_start = Instant::now();
        let initial_count = host_count.load(Ordering::SeqCst);

        let remaining: Vec<Ipv4Addr> = {
            let map = discovered
                .lock()
                .map_err(|_| anyhow!("ARP reply map lock poisoned"))?;
            target_ips
                .iter()
                .filter(|ip| !map.contains_key(ip))
                .copied()
                .collect()
        };

        if remaining.is_empty() {
            crate::log_debug!("Round {}/{}: every host answered, skipping", round, rounds);
            break;
        }

        for target_ip in &remaining {
            match create_arp_request(interface.mac, interface.ip, *target_ip) {
                Ok(packet) => {
                    let _ = tx.send_to(&packet, None);
                }
                Err(e) => crate::log_warn!("Failed to build ARP request for {}: {}", target_ip, e),
            }
        }

        let mut last_count = host_count.load(Ordering::SeqCst);
        let mut last_change = Instant::now();

        while round_start.elapsed() < max_wait {
            std::thread::sleep(check_interval);

            let current = host_count.load(Ordering::SeqCst);
            if current > last_count {
                last_count = current;
                last_change = Instant::now();
            } else if last_change.elapsed() >= idle_timeout {
                break;
            }
        }

        let final_count = host_count.load(Ordering::SeqCst);
        crate::log_debug!(
            "Round {}/{}: {} hosts ({} new) in {:?}",
            round,
            rounds,
            final_count,
            final_count - initial_count,
            round_start.elapsed()
        );
    }

    if receiver.join().is_err() {
        return Err(anyhow!("ARP receiver thread panicked"));
    }

    let map = discovered
        .lock()
        .map_err(|_| anyhow!("ARP reply map lock poisoned"))?;

    crate::log_info!(
        "ARP sweep complete: {} hosts in {:?}",
        map.len(),
        sweep_start.elapsed()
    );

    Ok(map.clone())
}

/// Scanner that sweeps the local segment with ARP requests
#[derive(Debug, Clone, Default)]
pub struct ArpScanner {
    interface: Option<String>,
}

impl ArpScanner {
    /// `interface` selects an adapter by name; `None` picks the best one
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }

    fn resolve_interface(&self) -> Result<InterfaceInfo> {
        match &self.interface {
            Some(name) => find_interface_by_name(name),
            None => find_valid_interface(),
        }
    }

    async fn sweep(&self) -> Result<ScanSnapshot> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let interface = self.resolve_interface()?;
        let (subnet, ips) = calculate_subnet_ips(&interface)?;

        let handle = tokio::task::spawn_blocking({
            let interface = interface.clone();
            move || active_arp_scan(&interface, &ips, &subnet)
        });

        let phase_timeout = arp_phase_timeout(arp_max_wait_ms(), arp_rounds());
        let replies = match tokio::time::timeout(phase_timeout, handle).await {
            Ok(joined) => joined.context("ARP scan task failed")??,
            Err(_) => {
                return Err(anyhow!("ARP sweep exceeded {:?} timeout", phase_timeout));
            }
        };

        let mut snapshot = ScanSnapshot::new(started_at, interface.name.clone(), subnet.to_string());
        for (ip, reply) in replies {
            if ip == interface.ip {
                continue;
            }
            snapshot.push(Sighting {
                mac: reply.mac.to_string(),
                ip,
                seen_at: reply.received_at.max(started_at),
            });
        }

        Ok(snapshot.with_duration_ms(clock.elapsed().as_millis() as u64))
    }
}

impl DeviceScanner for ArpScanner {
    fn name(&self) -> &str {
        "arp"
    }

    fn scan(&self) -> ScanFuture<'_> {
        Box::pin(self.sweep())
    }
}
