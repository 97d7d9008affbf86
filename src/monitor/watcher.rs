//! Background network watcher
//!
//! Runs scan cycles on an interval and feeds their results through the
//! registry, presence tracker and event log. Reports through a callback.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::events::{MonitorEvent, MonitorStatus};
use crate::config::{DEFAULT_MONITOR_INTERVAL, MAX_MONITOR_INTERVAL, MIN_MONITOR_INTERVAL};
use crate::database::{EventKind, EventRecord, queries};
use crate::eventlog::{AlertNotifier, EventLog, FileLogMirror, OnlineDevice, PresenceTracker};
use crate::registry::DeviceRegistry;
use crate::scanner::DeviceScanner;

/// Event callback type
pub type EventCallback = Arc<dyn Fn(MonitorEvent) + Send + Sync>;

type Callback<'a> = &'a (dyn Fn(MonitorEvent) + Send + Sync);

/// Outcome of one scan cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub scan_number: u32,
    pub started_at: DateTime<Utc>,
    pub hosts_found: usize,
    /// Events appended to the log, in append order
    pub events: Vec<EventRecord>,
    /// Detected events the log refused
    pub events_rejected: usize,
    pub alerts_sent: usize,
    pub duration_ms: u64,
}

/// Scan loop over one scanner, registry and event log
#[derive(Clone)]
pub struct Monitor {
    scanner: Arc<dyn DeviceScanner>,
    registry: DeviceRegistry,
    log: EventLog,
    mirror: Option<FileLogMirror>,
    notifier: Option<AlertNotifier>,
    tracker: Arc<Mutex<PresenceTracker>>,
    cycle_lock: Arc<Mutex<()>>,
    is_running: Arc<AtomicBool>,
    interval_seconds: Arc<Mutex<u64>>,
    scan_count: Arc<AtomicU32>,
    last_scan_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl Monitor {
    pub fn new(scanner: Arc<dyn DeviceScanner>, registry: DeviceRegistry, log: EventLog) -> Self {
        Self {
            scanner,
            registry,
            log,
            mirror: None,
            notifier: None,
            tracker: Arc::new(Mutex::new(PresenceTracker::default())),
            cycle_lock: Arc::new(Mutex::new(())),
            is_running: Arc::new(AtomicBool::new(false)),
            interval_seconds: Arc::new(Mutex::new(DEFAULT_MONITOR_INTERVAL)),
            scan_count: Arc::new(AtomicU32::new(0)),
            last_scan_time: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_mirror(mut self, mirror: FileLogMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_notifier(mut self, notifier: AlertNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the presence tracker; call before the first cycle
    pub fn with_disconnect_after_misses(mut self, misses: u32) -> Self {
        self.tracker = Arc::new(Mutex::new(PresenceTracker::new(misses)));
        self
    }

    /// Start from `tracker` instead of an empty one; call before the first cycle
    pub fn with_tracker(mut self, tracker: PresenceTracker) -> Self {
        self.tracker = Arc::new(Mutex::new(tracker));
        self
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Run one scan cycle without a callback
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        self.run_cycle_with(&|_| {}).await
    }

    /// Scan, record sightings, detect presence changes and append events.
    ///
    /// Events the log rejects are skipped with a warning. Mirror and
    /// notifier failures never fail the cycle.
    pub async fn run_cycle_with(&self, callback: Callback<'_>) -> Result<CycleSummary> {
        let _cycle = self.cycle_lock.lock().await;

        let scan_number = self.scan_count.fetch_add(1, Ordering::SeqCst) + 1;
        callback(MonitorEvent::ScanStarted { scan_number });
        crate::log_debug!("Starting scan #{} with {}", scan_number, self.scanner.name());
        let clock = Instant::now();

        let snapshot = self.scanner.scan().await?;

        for sighting in snapshot.sightings() {
            self.registry.record_sighting(sighting)?;
        }

        let detected = {
            let mut tracker = self.tracker.lock().await;
            tracker.observe(&snapshot, &self.registry)?
        };

        let mut events = Vec::with_capacity(detected.len());
        let mut events_rejected = 0;
        for new_event in detected {
            let mac = new_event.mac.clone();
            match self.log.append(new_event) {
                Ok(record) => {
                    crate::log_device_event!(record);
                    callback(event_notification(&record));
                    events.push(record);
                }
                Err(e) => {
                    events_rejected += 1;
                    crate::log_warn!("Event for {} not logged: {:#}", mac, e);
                }
            }
        }

        let duration_ms = clock.elapsed().as_millis() as u64;
        self.registry.database().with_conn(|conn| {
            queries::insert_scan(
                conn,
                &snapshot.started_at,
                &snapshot.interface_name,
                &snapshot.subnet,
                snapshot.len(),
                duration_ms,
            )
        })?;

        if let Some(mirror) = &self.mirror {
            self.mirror_cycle(mirror, &snapshot.started_at, &snapshot, &events);
        }

        let mut alerts_sent = 0;
        if let Some(notifier) = &self.notifier {
            for event in &events {
                if notifier.notify(event).await {
                    alerts_sent += 1;
                }
            }
        }

        *self.last_scan_time.lock().await = Some(Utc::now());

        callback(MonitorEvent::ScanCompleted {
            scan_number,
            hosts_found: snapshot.len(),
            events_logged: events.len(),
            duration_ms,
        });
        crate::log_info!(
            "Scan #{} complete: {} hosts, {} events in {}ms",
            scan_number,
            snapshot.len(),
            events.len(),
            duration_ms
        );

        Ok(CycleSummary {
            scan_number,
            started_at: snapshot.started_at,
            hosts_found: snapshot.len(),
            events,
            events_rejected,
            alerts_sent,
            duration_ms,
        })
    }

    fn mirror_cycle(
        &self,
        mirror: &FileLogMirror,
        at: &DateTime<Utc>,
        snapshot: &crate::models::ScanSnapshot,
        events: &[EventRecord],
    ) {
        let rows: Vec<(String, String, String)> = snapshot
            .sightings()
            .map(|s| {
                let name = self
                    .registry
                    .get(&s.mac)
                    .ok()
                    .flatten()
                    .map(|d| d.display_name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                (name, s.ip.to_string(), s.mac.clone())
            })
            .collect();

        let result = mirror
            .append_scan(
                *at,
                rows.iter()
                    .map(|(n, i, m)| (n.as_str(), i.as_str(), m.as_str())),
            )
            .and_then(|_| events.iter().try_for_each(|e| mirror.append_event(e)));

        if let Err(e) = result {
            crate::log_warn!("Event mirror {} not updated: {:#}", mirror.path().display(), e);
        }
    }

    /// Start background monitoring with event callback.
    ///
    /// Calling this while running only updates the interval.
    pub async fn start<F>(&self, callback: F, interval: Option<u64>) -> Result<()>
    where
        F: Fn(MonitorEvent) + Send + Sync + 'static,
    {
        let requested_interval = interval
            .unwrap_or(DEFAULT_MONITOR_INTERVAL)
            .clamp(MIN_MONITOR_INTERVAL, MAX_MONITOR_INTERVAL);

        *self.interval_seconds.lock().await = requested_interval;
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let callback: EventCallback = Arc::new(callback);
        callback(MonitorEvent::MonitoringStarted {
            interval_seconds: requested_interval,
        });

        let monitor = self.clone();
        tokio::spawn(async move {
            crate::log_info!(
                "[MONITOR] Background monitoring started (interval: {}s)",
                requested_interval
            );

            while monitor.is_running.load(Ordering::SeqCst) {
                if let Err(e) = monitor.run_cycle_with(callback.as_ref()).await {
                    crate::log_warn!("[MONITOR] Scan cycle failed: {:#}", e);
                    callback(MonitorEvent::MonitoringError {
                        message: format!("{:#}", e),
                    });
                }

                // Sleep in one-second steps so stop() takes effect quickly
                let interval = *monitor.interval_seconds.lock().await;
                for _ in 0..interval {
                    if !monitor.is_running.load(Ordering::SeqCst) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }

            crate::log_info!("[MONITOR] Background monitoring stopped");
            callback(MonitorEvent::MonitoringStopped);
        });

        Ok(())
    }

    /// Stop background monitoring
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Devices that answered the last completed scan
    pub async fn online(&self) -> Vec<OnlineDevice> {
        self.tracker.lock().await.online()
    }

    pub async fn status(&self) -> MonitorStatus {
        MonitorStatus {
            is_running: self.is_running(),
            interval_seconds: *self.interval_seconds.lock().await,
            scan_count: self.scan_count.load(Ordering::SeqCst),
            last_scan_time: *self.last_scan_time.lock().await,
            devices_online: self.tracker.lock().await.online().len(),
        }
    }
}

fn event_notification(record: &EventRecord) -> MonitorEvent {
    match record.kind {
        EventKind::Connect => MonitorEvent::DeviceConnected {
            mac: record.mac.clone(),
            ip: record.ip.clone(),
            name: record.device_name.clone(),
            classification: record.classification,
        },
        EventKind::Disconnect => MonitorEvent::DeviceDisconnected {
            mac: record.mac.clone(),
            last_ip: record.ip.clone(),
            name: record.device_name.clone(),
            classification: record.classification,
        },
    }
}
