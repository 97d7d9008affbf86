//! Append-only log of device connect and disconnect events
//!
//! - [`EventLog`]: validated appends and read queries over the `events` table
//! - [`PresenceTracker`]: turns consecutive scan snapshots into events
//! - [`FileLogMirror`]: optional plain-text copy of the log
//! - [`AlertNotifier`]: optional webhook for unknown devices

mod mirror;
mod notifier;
mod tracker;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::queries::{self, EventInsert};
use crate::database::{Classification, Database, EventKind, EventRecord};

pub use mirror::FileLogMirror;
pub use notifier::{AlertNotifier, AlertPayload};
pub use tracker::{OnlineDevice, PresenceTracker};

/// An event that has not been appended yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub mac: String,
    pub kind: EventKind,
    /// Registration status when the event was detected
    pub classification: Classification,
    pub device_name: Option<String>,
    pub ip: Option<String>,
}

#[derive(Clone)]
pub struct EventLog {
    db: Database,
}

impl EventLog {
    pub fn open(db: Database) -> Self {
        Self { db }
    }

    /// Append `event` and return the stored record.
    ///
    /// The MAC is normalized before lookup. Rejected when the MAC was never sighted, when the timestamp precedes
    /// the device's first sighting, or when it is older than the last
    /// appended event.
    pub fn append(&self, mut event: NewEvent) -> Result<EventRecord> {
        event.mac = crate::models::normalize_mac(&event.mac)?;
        self.db.with_conn(|conn| {
            let device = queries::get_device(conn, &event.mac)?
                .with_context(|| format!("Cannot log event for unknown device {}", event.mac))?;

            let Some(first_seen) = device.first_seen else {
                bail!("Cannot log event for {}: device was never sighted", event.mac);
            };
            if event.timestamp < first_seen {
                bail!(
                    "Event for {} at {} precedes its first sighting at {}",
                    event.mac,
                    event.timestamp,
                    first_seen
                );
            }

            if let Some(last) = queries::get_last_event(conn)?
                && event.timestamp < last.timestamp
            {
                bail!(
                    "Event at {} is older than the last logged event at {}",
                    event.timestamp,
                    last.timestamp
                );
            }

            let id = queries::insert_event(
                conn,
                &EventInsert {
                    timestamp: event.timestamp,
                    mac: &event.mac,
                    kind: event.kind,
                    classification: event.classification,
                    device_name: event.device_name.as_deref(),
                    ip: event.ip.as_deref(),
                },
            )?;

            queries::get_event(conn, id)?.with_context(|| format!("Event {} missing after insert", id))
        })
    }

    /// Every event in append order
    pub fn all(&self) -> Result<Vec<EventRecord>> {
        self.db.with_conn(queries::get_all_events)
    }

    /// Events with `start <= timestamp <= end`
    pub fn between(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<Vec<EventRecord>> {
        self.db
            .with_conn(|conn| queries::get_events_between(conn, start, end))
    }

    pub fn for_device(&self, mac: &str) -> Result<Vec<EventRecord>> {
        let mac = crate::models::normalize_mac(mac)?;
        self.db
            .with_conn(|conn| queries::get_events_for_device(conn, &mac))
    }

    /// Most recent event of every device that has one, ordered by MAC
    pub fn last_per_device(&self) -> Result<Vec<EventRecord>> {
        self.db.with_conn(queries::get_last_event_per_device)
    }

    /// The `limit` most recent events, oldest first
    pub fn latest(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .with_conn(|conn| queries::get_latest_events(conn, limit))
    }

    pub fn len(&self) -> Result<usize> {
        let count = self.db.with_conn(queries::count_events)?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sighting;
    use crate::registry::DeviceRegistry;
    use chrono::{Duration, TimeZone};

    const LAPTOP: &str = "00:1c:b3:01:02:03";

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn setup() -> (DeviceRegistry, EventLog) {
        let registry = DeviceRegistry::in_memory().unwrap();
        let log = EventLog::open(registry.database().clone());
        (registry, log)
    }

    fn connect(mac: &str, at: DateTime<Utc>) -> NewEvent {
        NewEvent {
            timestamp: at,
            mac: mac.to_string(),
            kind: EventKind::Connect,
            classification: Classification::Unregistered,
            device_name: None,
            ip: Some("192.168.1.40".to_string()),
        }
    }

    fn sight(registry: &DeviceRegistry, mac: &str, at: DateTime<Utc>) {
        registry
            .record_sighting(&Sighting::new(mac, "192.168.1.40".parse().unwrap(), at).unwrap())
            .unwrap();
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        let first = log.append(connect(LAPTOP, base())).unwrap();
        let second = log.append(connect(LAPTOP, base() + Duration::minutes(1))).unwrap();

        assert!(second.id > first.id);
        assert_eq!(log.len().unwrap(), 2);
        assert_eq!(log.all().unwrap(), vec![first, second]);
    }

    #[test]
    fn append_normalizes_mac_before_lookup() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        let record = log.append(connect("00-1C-B3-01-02-03", base())).unwrap();
        assert_eq!(record.mac, LAPTOP);
        assert!(log.append(connect("not-a-mac", base())).is_err());
    }

    #[test]
    fn last_per_device_keeps_only_newest_event() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());
        sight(&registry, "aa:aa:aa:aa:aa:aa", base());

        log.append(connect(LAPTOP, base())).unwrap();
        log.append(connect("aa:aa:aa:aa:aa:aa", base())).unwrap();
        let mut gone = connect(LAPTOP, base() + Duration::minutes(5));
        gone.kind = EventKind::Disconnect;
        log.append(gone).unwrap();

        let last = log.last_per_device().unwrap();
        let summary: Vec<(&str, EventKind)> =
            last.iter().map(|e| (e.mac.as_str(), e.kind)).collect();
        assert_eq!(
            summary,
            vec![(LAPTOP, EventKind::Disconnect), ("aa:aa:aa:aa:aa:aa", EventKind::Connect)]
        );
    }

    #[test]
    fn append_rejects_unknown_device() {
        let (_registry, log) = setup();
        assert!(log.append(connect(LAPTOP, base())).is_err());
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn append_rejects_registered_but_never_sighted_device() {
        let (registry, log) = setup();
        registry.register(LAPTOP, Some("Laptop")).unwrap();
        assert!(log.append(connect(LAPTOP, base())).is_err());
    }

    #[test]
    fn append_rejects_event_before_first_sighting() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        let err = log
            .append(connect(LAPTOP, base() - Duration::hours(1)))
            .unwrap_err();
        assert!(err.to_string().contains("first sighting"));
    }

    #[test]
    fn append_rejects_out_of_order_timestamp() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        log.append(connect(LAPTOP, base() + Duration::minutes(10))).unwrap();
        assert!(log.append(connect(LAPTOP, base() + Duration::minutes(5))).is_err());
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn between_is_inclusive() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        for minutes in [0, 10, 20] {
            log.append(connect(LAPTOP, base() + Duration::minutes(minutes))).unwrap();
        }

        let hits = log
            .between(&(base() + Duration::minutes(10)), &(base() + Duration::minutes(20)))
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn latest_returns_tail_oldest_first() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());

        for minutes in 0..5 {
            log.append(connect(LAPTOP, base() + Duration::minutes(minutes))).unwrap();
        }

        let tail = log.latest(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail[0].id < tail[1].id);
        assert_eq!(tail[1].timestamp, base() + Duration::minutes(4));
    }

    #[test]
    fn for_device_filters_by_normalized_mac() {
        let (registry, log) = setup();
        sight(&registry, LAPTOP, base());
        sight(&registry, "aa:aa:aa:aa:aa:aa", base());

        log.append(connect(LAPTOP, base())).unwrap();
        log.append(connect("aa:aa:aa:aa:aa:aa", base())).unwrap();

        assert_eq!(log.for_device("00-1C-B3-01-02-03").unwrap().len(), 1);
    }
}
