//! Presence tracking across scan snapshots

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::{EventLog, NewEvent};
use crate::database::{Classification, EventKind};
use crate::models::ScanSnapshot;
use crate::registry::DeviceRegistry;

#[derive(Debug, Clone)]
struct Presence {
    ip: Option<Ipv4Addr>,
    seen_at: DateTime<Utc>,
    misses: u32,
}

/// Device that answered the most recent scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineDevice {
    pub mac: String,
    pub ip: Ipv4Addr,
    pub seen_at: DateTime<Utc>,
}

/// Remembers which devices are present and emits connect/disconnect events.
///
/// A device counts as disconnected after missing `disconnect_after_misses`
/// consecutive scans. Reappearing before that resets its miss count.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    present: HashMap<String, Presence>,
    disconnect_after_misses: u32,
    snapshots_seen: u64,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(crate::config::DISCONNECT_AFTER_MISSES)
    }
}

impl PresenceTracker {
    /// Threshold values below 1 are treated as 1
    pub fn new(disconnect_after_misses: u32) -> Self {
        Self {
            present: HashMap::new(),
            disconnect_after_misses: disconnect_after_misses.max(1),
            snapshots_seen: 0,
        }
    }

    /// Tracker that picks up where `log` left off.
    ///
    /// Every device whose newest event is a connect starts out present, so
    /// the next snapshot only connects newcomers and disconnects leavers.
    pub fn resume(log: &EventLog, disconnect_after_misses: u32) -> Result<Self> {
        let mut tracker = Self::new(disconnect_after_misses);
        for event in log.last_per_device()? {
            if event.kind != EventKind::Connect {
                continue;
            }
            let ip = event.ip.as_deref().and_then(|ip| ip.parse().ok());
            tracker.present.insert(
                event.mac,
                Presence {
                    ip,
                    seen_at: event.timestamp,
                    misses: 0,
                },
            );
        }
        crate::log_debug!("Resumed presence of {} device(s) from the log", tracker.present.len());
        Ok(tracker)
    }

    pub fn disconnect_after_misses(&self) -> u32 {
        self.disconnect_after_misses
    }

    pub fn snapshots_seen(&self) -> u64 {
        self.snapshots_seen
    }

    /// Compare `snapshot` with the devices already present.
    ///
    /// Event names and classifications come from `registry` as it is now.
    /// Returned events are ordered by timestamp; disconnects are stamped
    /// with the snapshot start time. On error the tracker is unchanged.
    pub fn observe(
        &mut self,
        snapshot: &ScanSnapshot,
        registry: &DeviceRegistry,
    ) -> Result<Vec<NewEvent>> {
        let mut missing = Vec::new();
        let mut gone = Vec::new();
        for (mac, presence) in &self.present {
            if snapshot.contains(mac) {
                continue;
            }
            if presence.misses + 1 >= self.disconnect_after_misses {
                gone.push(mac.clone());
            } else {
                missing.push(mac.clone());
            }
        }
        gone.sort();

        let mut disconnects = Vec::with_capacity(gone.len());
        for mac in &gone {
            let ip = self.present.get(mac).and_then(|presence| presence.ip);
            disconnects.push(Self::event_for(
                registry,
                mac.clone(),
                EventKind::Disconnect,
                snapshot.started_at,
                ip,
            )?);
        }

        let mut connects = Vec::new();
        for sighting in snapshot.sightings() {
            if !self.present.contains_key(&sighting.mac) {
                connects.push(Self::event_for(
                    registry,
                    sighting.mac.clone(),
                    EventKind::Connect,
                    sighting.seen_at,
                    Some(sighting.ip),
                )?);
            }
        }

        for mac in &missing {
            if let Some(presence) = self.present.get_mut(mac) {
                presence.misses += 1;
            }
        }
        for mac in &gone {
            self.present.remove(mac);
        }
        for sighting in snapshot.sightings() {
            self.present.insert(
                sighting.mac.clone(),
                Presence {
                    ip: Some(sighting.ip),
                    seen_at: sighting.seen_at,
                    misses: 0,
                },
            );
        }
        self.snapshots_seen += 1;

        connects.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.mac.cmp(&b.mac)));
        disconnects.extend(connects);
        Ok(disconnects)
    }

    fn event_for(
        registry: &DeviceRegistry,
        mac: String,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        ip: Option<Ipv4Addr>,
    ) -> Result<NewEvent> {
        let device = registry.get(&mac)?;
        let classification = device
            .as_ref()
            .map(|d| d.classification())
            .unwrap_or(Classification::Unregistered);
        Ok(NewEvent {
            timestamp,
            classification,
            device_name: device.and_then(|d| d.name),
            mac,
            kind,
            ip: ip.map(|ip| ip.to_string()),
        })
    }

    /// Devices that answered the latest snapshot, ordered by MAC.
    ///
    /// Empty until the first snapshot has been observed.
    pub fn online(&self) -> Vec<OnlineDevice> {
        if self.snapshots_seen == 0 {
            return Vec::new();
        }
        let mut online: Vec<OnlineDevice> = self
            .present
            .iter()
            .filter(|(_, presence)| presence.misses == 0)
            .filter_map(|(mac, presence)| {
                Some(OnlineDevice {
                    mac: mac.clone(),
                    ip: presence.ip?,
                    seen_at: presence.seen_at,
                })
            })
            .collect();
        online.sort_by(|a, b| a.mac.cmp(&b.mac));
        online
    }

    pub fn is_present(&self, mac: &str) -> bool {
        self.present.contains_key(mac)
    }
}
