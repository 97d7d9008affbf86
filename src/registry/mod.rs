//! Device registry
//!
//! Tracks every device ever sighted on the network and which of them the
//! owner has registered. Devices are identified by normalized MAC address.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::database::queries::{self, SightingUpsert};
use crate::database::{Classification, Database, DeviceRecord};
use crate::models::{Sighting, normalize_mac};
use crate::network::lookup_vendor;

/// Entry of a known-devices JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownDevice {
    pub name: String,
    pub mac: String,
    /// Informational only; devices are matched by MAC
    #[serde(default)]
    pub ip: Option<String>,
}

fn clean_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

#[derive(Clone)]
pub struct DeviceRegistry {
    db: Database,
}

impl DeviceRegistry {
    pub fn open(db: Database) -> Self {
        Self { db }
    }

    /// Registry over a fresh in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self::open(Database::in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Mark a device as registered under `name`.
    ///
    /// Unknown devices are created without sighting times. A blank name keeps
    /// whatever name the device already had.
    pub fn register(&self, mac: &str, name: Option<&str>) -> Result<DeviceRecord> {
        let mac = normalize_mac(mac)?;
        let name = clean_name(name);
        let device = self
            .db
            .with_conn(|conn| queries::register_device(conn, &mac, name))?;
        crate::log_info!("Registered {} as '{}'", device.mac, device.display_name());
        Ok(device)
    }

    /// Clear the registration flag; the name is kept
    pub fn unregister(&self, mac: &str) -> Result<DeviceRecord> {
        let mac = normalize_mac(mac)?;
        let found = self
            .db
            .with_conn(|conn| queries::set_registered(conn, &mac, false))?;
        if !found {
            bail!("Unknown device: {}", mac);
        }
        crate::log_info!("Unregistered {}", mac);
        self.require(&mac)
    }

    pub fn rename(&self, mac: &str, name: Option<&str>) -> Result<DeviceRecord> {
        let mac = normalize_mac(mac)?;
        let name = clean_name(name);
        let found = self
            .db
            .with_conn(|conn| queries::update_device_name(conn, &mac, name))?;
        if !found {
            bail!("Unknown device: {}", mac);
        }
        self.require(&mac)
    }

    pub fn get(&self, mac: &str) -> Result<Option<DeviceRecord>> {
        let mac = normalize_mac(mac)?;
        self.db.with_conn(|conn| queries::get_device(conn, &mac))
    }

    fn require(&self, mac: &str) -> Result<DeviceRecord> {
        self.db
            .with_conn(|conn| queries::get_device(conn, mac))?
            .with_context(|| format!("Unknown device: {}", mac))
    }

    /// All devices, ordered by MAC
    pub fn list(&self) -> Result<Vec<DeviceRecord>> {
        self.db.with_conn(queries::get_all_devices)
    }

    pub fn list_registered(&self) -> Result<Vec<DeviceRecord>> {
        self.db.with_conn(queries::get_registered_devices)
    }

    /// `Registered` only for a known device with the flag set
    pub fn classify(&self, mac: &str) -> Result<Classification> {
        Ok(self
            .get(mac)?
            .map(|device| device.classification())
            .unwrap_or(Classification::Unregistered))
    }

    /// Record a scan sighting, creating the device on first contact
    pub fn record_sighting(&self, sighting: &Sighting) -> Result<DeviceRecord> {
        let vendor = lookup_vendor(&sighting.mac);
        let ip = sighting.ip.to_string();
        self.db.with_conn(|conn| {
            queries::upsert_sighting(
                conn,
                &SightingUpsert {
                    mac: &sighting.mac,
                    ip: &ip,
                    seen_at: sighting.seen_at,
                    vendor: vendor.as_deref(),
                },
            )
        })
    }

    /// Register every entry of a known-devices JSON file.
    ///
    /// The whole file is validated before anything is written.
    pub fn import_known_devices(&self, path: &Path) -> Result<Vec<DeviceRecord>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read known devices file {}", path.display()))?;
        let entries: Vec<KnownDevice> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid known devices file {}", path.display()))?;

        let mut validated = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let mac = normalize_mac(&entry.mac).with_context(|| {
                format!("Known device #{} ('{}') has an invalid MAC", index + 1, entry.name)
            })?;
            validated.push((mac, entry.name.as_str()));
        }

        let devices = validated
            .into_iter()
            .map(|(mac, name)| self.register(&mac, Some(name)))
            .collect::<Result<Vec<_>>>()?;

        crate::log_info!(
            "Imported {} known devices from {}",
            devices.len(),
            path.display()
        );
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::net::Ipv4Addr;

    const PHONE: &str = "34:4a:c3:22:6f:90";

    fn sighting(mac: &str, ip: [u8; 4], secs: i64) -> Sighting {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs);
        Sighting::new(mac, Ipv4Addr::from(ip), at).unwrap()
    }

    #[test]
    fn register_unknown_device_has_no_sighting_times() {
        let registry = DeviceRegistry::in_memory().unwrap();
        let device = registry.register("34-4A-C3-22-6F-90", Some("Phone")).unwrap();

        assert_eq!(device.mac, PHONE);
        assert_eq!(device.name.as_deref(), Some("Phone"));
        assert!(device.registered);
        assert!(device.first_seen.is_none());
        assert!(device.last_seen.is_none());
    }

    #[test]
    fn blank_name_keeps_existing_name() {
        let registry = DeviceRegistry::in_memory().unwrap();
        registry.register(PHONE, Some("Phone")).unwrap();

        let device = registry.register(PHONE, Some("   ")).unwrap();
        assert_eq!(device.name.as_deref(), Some("Phone"));
    }

    #[test]
    fn classify_follows_registration() {
        let registry = DeviceRegistry::in_memory().unwrap();
        assert_eq!(registry.classify(PHONE).unwrap(), Classification::Unregistered);

        registry.record_sighting(&sighting(PHONE, [192, 168, 1, 20], 0)).unwrap();
        assert_eq!(registry.classify(PHONE).unwrap(), Classification::Unregistered);

        registry.register(PHONE, Some("Phone")).unwrap();
        assert_eq!(registry.classify(PHONE).unwrap(), Classification::Registered);

        let device = registry.unregister(PHONE).unwrap();
        assert_eq!(device.name.as_deref(), Some("Phone"));
        assert_eq!(registry.classify(PHONE).unwrap(), Classification::Unregistered);
    }

    #[test]
    fn unregister_and_rename_reject_unknown_devices() {
        let registry = DeviceRegistry::in_memory().unwrap();
        assert!(registry.unregister(PHONE).is_err());
        assert!(registry.rename(PHONE, Some("Phone")).is_err());
    }

    #[test]
    fn rename_to_blank_clears_name() {
        let registry = DeviceRegistry::in_memory().unwrap();
        registry.register(PHONE, Some("Phone")).unwrap();

        let device = registry.rename(PHONE, Some("")).unwrap();
        assert!(device.name.is_none());
        assert_eq!(device.display_name(), "unknown");
    }

    #[test]
    fn sighting_times_are_monotonic() {
        let registry = DeviceRegistry::in_memory().unwrap();

        let first = registry.record_sighting(&sighting(PHONE, [192, 168, 1, 20], 60)).unwrap();
        assert_eq!(first.first_seen, first.last_seen);

        let later = registry.record_sighting(&sighting(PHONE, [192, 168, 1, 21], 120)).unwrap();
        assert_eq!(later.first_seen, first.first_seen);
        assert_eq!(later.last_ip.as_deref(), Some("192.168.1.21"));

        let earlier = registry.record_sighting(&sighting(PHONE, [192, 168, 1, 22], 0)).unwrap();
        assert!(earlier.first_seen < first.first_seen);
        assert_eq!(earlier.last_seen, later.last_seen);
        assert_eq!(earlier.last_ip.as_deref(), Some("192.168.1.21"));
    }

    #[test]
    fn randomized_mac_gets_private_vendor() {
        let registry = DeviceRegistry::in_memory().unwrap();
        let device = registry
            .record_sighting(&sighting("da:a1:19:00:00:01", [192, 168, 1, 30], 0))
            .unwrap();
        assert_eq!(
            device.vendor.as_deref(),
            Some(crate::network::RANDOMIZED_VENDOR)
        );
    }

    #[test]
    fn list_is_ordered_by_mac() {
        let registry = DeviceRegistry::in_memory().unwrap();
        registry.register("bb:00:00:00:00:02", Some("B")).unwrap();
        registry.record_sighting(&sighting("aa:00:00:00:00:01", [10, 0, 0, 2], 0)).unwrap();

        let macs: Vec<String> = registry.list().unwrap().into_iter().map(|d| d.mac).collect();
        assert_eq!(macs, vec!["aa:00:00:00:00:01", "bb:00:00:00:00:02"]);
        assert_eq!(registry.list_registered().unwrap().len(), 1);
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("mynet-{}-{}.json", name, nanos));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn import_known_devices_registers_entries() {
        let registry = DeviceRegistry::in_memory().unwrap();
        let path = write_temp(
            "known",
            r#"[
                {"name": "Jose's Phone", "mac": "34:4A:C3:22:6F:90", "ip": "192.168.1.20"},
                {"name": "Printer", "mac": "00-1c-b3-01-02-03"}
            ]"#,
        );

        let devices = registry.import_known_devices(&path).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(registry.classify("00:1c:b3:01:02:03").unwrap(), Classification::Registered);
        assert_eq!(
            registry.get(PHONE).unwrap().and_then(|d| d.name).as_deref(),
            Some("Jose's Phone")
        );

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn import_with_bad_mac_writes_nothing() {
        let registry = DeviceRegistry::in_memory().unwrap();
        let path = write_temp(
            "bad",
            r#"[
                {"name": "Phone", "mac": "34:4a:c3:22:6f:90"},
                {"name": "Broken", "mac": "nope"}
            ]"#,
        );

        let err = registry.import_known_devices(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Broken"));
        assert!(registry.list().unwrap().is_empty());

        let _ = std::fs::remove_file(path);
    }
}
