use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mynet::database::queries;
use mynet::{
    Classification, DateWindow, DeviceRegistry, DeviceScanner, EventKind, EventLog,
    FileLogMirror, Monitor, Reporter, ScanFuture, ScanSnapshot, Sighting,
};

const LAPTOP: &str = "00:1c:b3:01:02:03";
const GUEST: &str = "da:a1:19:00:00:01";

/// Plays back snapshots in order, then fails
struct ReplayScanner {
    snapshots: Mutex<VecDeque<ScanSnapshot>>,
}

impl ReplayScanner {
    fn new(snapshots: Vec<ScanSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: Mutex::new(snapshots.into()),
        })
    }
}

impl DeviceScanner for ReplayScanner {
    fn name(&self) -> &str {
        "replay"
    }

    fn scan(&self) -> ScanFuture<'_> {
        let next = self
            .snapshots
            .lock()
            .expect("scanner lock should not be poisoned")
            .pop_front()
            .ok_or_else(|| anyhow!("replay exhausted"));
        Box::pin(async move { next })
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0)
        .single()
        .expect("valid test timestamp")
}

fn snapshot(when: DateTime<Utc>, devices: &[(&str, u8)]) -> ScanSnapshot {
    let mut snapshot = ScanSnapshot::new(when, "test0", "192.168.7.0/24");
    for (mac, host) in devices {
        snapshot.push(
            Sighting::new(mac, Ipv4Addr::new(192, 168, 7, *host), when + Duration::seconds(1))
                .expect("valid test MAC"),
        );
    }
    snapshot
}

fn unique_temp_path(prefix: &str, ext: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{}_{}.{}", prefix, timestamp, ext))
}

#[tokio::test]
async fn monitor_logs_presence_changes_across_days() {
    let registry = DeviceRegistry::in_memory().expect("in-memory registry");
    let log = EventLog::open(registry.database().clone());
    registry
        .register(LAPTOP, Some("Work Laptop"))
        .expect("register laptop");

    let mirror_path = unique_temp_path("mynet_mirror", "txt");
    let scanner = ReplayScanner::new(vec![
        snapshot(at(1, 9), &[(LAPTOP, 5)]),
        snapshot(at(1, 10), &[(LAPTOP, 5), (GUEST, 77)]),
        snapshot(at(2, 9), &[(LAPTOP, 6)]),
        snapshot(at(3, 9), &[]),
    ]);
    let monitor = Monitor::new(scanner, registry.clone(), log.clone())
        .with_mirror(FileLogMirror::new(&mirror_path));

    for _ in 0..4 {
        monitor.run_cycle().await.expect("cycle should succeed");
    }
    assert!(monitor.run_cycle().await.is_err());

    let events = log.all().expect("events");
    let kinds: Vec<(EventKind, &str)> = events.iter().map(|e| (e.kind, e.mac.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (EventKind::Connect, LAPTOP),
            (EventKind::Connect, GUEST),
            (EventKind::Disconnect, GUEST),
            (EventKind::Disconnect, LAPTOP),
        ]
    );
    assert!(events.windows(2).all(|w| w[0].id < w[1].id && w[0].timestamp <= w[1].timestamp));
    assert_eq!(events[1].classification, Classification::Unregistered);
    assert_eq!(events[3].device_name.as_deref(), Some("Work Laptop"));

    let laptop = registry.get(LAPTOP).expect("lookup").expect("laptop known");
    assert_eq!(laptop.last_ip.as_deref(), Some("192.168.7.6"));
    assert_eq!(laptop.first_seen, Some(at(1, 9) + Duration::seconds(1)));

    let reporter = Reporter::new(registry.clone(), log.clone());
    let day_one = reporter
        .log_report(Some(DateWindow::parse("2024-06-01", "2024-06-01").expect("window")))
        .expect("report");
    assert_eq!(day_one.events.len(), 2);

    let status = monitor.status().await;
    assert_eq!(status.scan_count, 5);
    assert_eq!(status.devices_online, 0);

    let mirror = std::fs::read_to_string(&mirror_path).expect("mirror written");
    assert!(mirror.contains("Devices found at 2024-06-01 09:00:00"));
    assert!(mirror.contains("Work Laptop 192.168.7.5 00:1c:b3:01:02:03"));
    assert!(mirror.contains("Unknown device detected on network. Device IP: 192.168.7.77"));

    let _ = std::fs::remove_file(mirror_path);
}

#[tokio::test]
async fn events_cannot_be_rewritten_through_sql() {
    let registry = DeviceRegistry::in_memory().expect("in-memory registry");
    let log = EventLog::open(registry.database().clone());
    let monitor = Monitor::new(
        ReplayScanner::new(vec![snapshot(at(1, 9), &[(GUEST, 77)])]),
        registry.clone(),
        log.clone(),
    );
    monitor.run_cycle().await.expect("cycle should succeed");

    let db = registry.database();
    let update = db.with_conn(|conn| {
        conn.execute("UPDATE events SET mac = 'ff:ff:ff:ff:ff:ff'", [])
            .map_err(anyhow::Error::from)
    });
    let delete = db.with_conn(|conn| {
        conn.execute("DELETE FROM events", [])
            .map_err(anyhow::Error::from)
    });

    assert!(update.is_err());
    assert!(delete.is_err());
    assert_eq!(log.len().expect("count"), 1);
    assert_eq!(
        db.with_conn(queries::count_events).expect("count"),
        1
    );
}

#[tokio::test]
async fn miss_threshold_suppresses_flapping() {
    let registry = DeviceRegistry::in_memory().expect("in-memory registry");
    let log = EventLog::open(registry.database().clone());
    let scanner = ReplayScanner::new(vec![
        snapshot(at(1, 9), &[(GUEST, 77)]),
        snapshot(at(1, 10), &[]),
        snapshot(at(1, 11), &[(GUEST, 77)]),
        snapshot(at(1, 12), &[]),
        snapshot(at(1, 13), &[]),
    ]);
    let monitor =
        Monitor::new(scanner, registry, log.clone()).with_disconnect_after_misses(2);

    let mut per_cycle = Vec::new();
    for _ in 0..5 {
        per_cycle.push(monitor.run_cycle().await.expect("cycle").events.len());
    }

    assert_eq!(per_cycle, vec![1, 0, 0, 0, 1]);
    let last = log.latest(1).expect("latest");
    assert_eq!(last[0].kind, EventKind::Disconnect);
    assert_eq!(last[0].timestamp, at(1, 13));
}
