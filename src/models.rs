//! Data models shared by the scanner, registry and monitor

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Normalize a MAC address to lowercase, colon-separated form.
///
/// Accepts `:` or `-` separators in either case.
pub fn normalize_mac(raw: &str) -> Result<String> {
    let cleaned = raw.trim().replace('-', ":");
    let mac: MacAddr = cleaned
        .parse()
        .map_err(|_| anyhow!("Invalid MAC address: '{}'", raw))?;
    Ok(mac.to_string())
}

/// One device observed during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Normalized MAC address
    pub mac: String,
    pub ip: Ipv4Addr,
    pub seen_at: DateTime<Utc>,
}

impl Sighting {
    pub fn new(mac: &str, ip: Ipv4Addr, seen_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            mac: normalize_mac(mac)?,
            ip,
            seen_at,
        })
    }
}

/// Devices reachable on the segment during one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub started_at: DateTime<Utc>,
    pub interface_name: String,
    pub subnet: String,
    pub duration_ms: u64,
    sightings: BTreeMap<String, Sighting>,
}

impl ScanSnapshot {
    pub fn new(
        started_at: DateTime<Utc>,
        interface_name: impl Into<String>,
        subnet: impl Into<String>,
    ) -> Self {
        Self {
            started_at,
            interface_name: interface_name.into(),
            subnet: subnet.into(),
            duration_ms: 0,
            sightings: BTreeMap::new(),
        }
    }

    /// Add a sighting; a repeated MAC replaces the earlier entry
    pub fn push(&mut self, sighting: Sighting) {
        self.sightings.insert(sighting.mac.clone(), sighting);
    }

    pub fn with_sighting(mut self, sighting: Sighting) -> Self {
        self.push(sighting);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sightings ordered by MAC
    pub fn sightings(&self) -> impl Iterator<Item = &Sighting> {
        self.sightings.values()
    }

    pub fn get(&self, mac: &str) -> Option<&Sighting> {
        self.sightings.get(mac)
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.sightings.contains_key(mac)
    }

    pub fn len(&self) -> usize {
        self.sightings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sightings.is_empty()
    }
}

/// Network interface information with MAC address
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub prefix_len: u8,
    pub pnet_interface: NetworkInterface,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_mac_accepts_dashes_and_uppercase() {
        assert_eq!(
            normalize_mac("AA-BB-CC-DD-EE-0F").unwrap(),
            "aa:bb:cc:dd:ee:0f"
        );
        assert_eq!(
            normalize_mac(" aa:bb:cc:dd:ee:0f ").unwrap(),
            "aa:bb:cc:dd:ee:0f"
        );
    }

    #[test]
    fn normalize_mac_rejects_garbage() {
        assert!(normalize_mac("not-a-mac").is_err());
        assert!(normalize_mac("aa:bb:cc:dd:ee").is_err());
        assert!(normalize_mac("").is_err());
    }

    #[test]
    fn snapshot_collapses_duplicate_macs() {
        let now = Utc::now();
        let snapshot = ScanSnapshot::new(now, "eth0", "192.168.1.0/24")
            .with_sighting(Sighting::new("aa:bb:cc:dd:ee:01", Ipv4Addr::new(192, 168, 1, 10), now).unwrap())
            .with_sighting(Sighting::new("AA:BB:CC:DD:EE:01", Ipv4Addr::new(192, 168, 1, 11), now).unwrap());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("aa:bb:cc:dd:ee:01").map(|s| s.ip),
            Some(Ipv4Addr::new(192, 168, 1, 11))
        );
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let now = Utc::now();
        let snapshot = ScanSnapshot::new(now, "eth0", "192.168.1.0/24").with_sighting(
            Sighting::new("aa:bb:cc:dd:ee:01", Ipv4Addr::new(192, 168, 1, 10), now).unwrap(),
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"interface_name\":\"eth0\""));
        assert!(json.contains("\"ip\":\"192.168.1.10\""));
    }
}
