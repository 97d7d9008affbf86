//! Read-only reports over the registry and event log

mod text;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::database::{Classification, EventRecord, UnregisteredSummary, queries};
use crate::eventlog::{EventLog, OnlineDevice};
use crate::exports::{export_devices_csv, export_devices_json, export_events_csv, export_events_json};
use crate::registry::DeviceRegistry;

pub use text::{render_device_table, render_log_table, render_unregistered_table};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of whole UTC days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("Start date {} is after end date {}", start, end);
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` start and end dates
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// First and last instants covered; the end day counts in full
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        (
            self.start.and_time(NaiveTime::MIN).and_utc(),
            self.end.and_time(last_second).and_utc(),
        )
    }
}

/// A device currently on the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub name: String,
    pub ip: String,
    pub mac: String,
    pub classification: Classification,
    pub vendor: Option<String>,
}

/// Events selected for a log report
#[derive(Debug, Clone, Serialize)]
pub struct LogReport {
    pub window: Option<DateWindow>,
    pub events: Vec<EventRecord>,
}

impl LogReport {
    pub fn render(&self) -> String {
        render_log_table(self)
    }

    pub fn to_csv(&self) -> Result<String> {
        export_events_csv(&self.events)
    }

    pub fn to_json(&self) -> Result<String> {
        export_events_json(&self.events, self.window.map(|w| (w.start, w.end)))
    }
}

/// Report queries over one database
#[derive(Clone)]
pub struct Reporter {
    registry: DeviceRegistry,
    log: EventLog,
}

impl Reporter {
    pub fn new(registry: DeviceRegistry, log: EventLog) -> Self {
        Self { registry, log }
    }

    /// Join devices seen in the last cycle with their registry entries
    pub fn current_activity(&self, online: &[OnlineDevice]) -> Result<Vec<ActivityRow>> {
        online
            .iter()
            .map(|device| {
                let record = self.registry.get(&device.mac)?;
                Ok(ActivityRow {
                    name: record
                        .as_ref()
                        .map(|r| r.display_name().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    ip: device.ip.to_string(),
                    mac: device.mac.clone(),
                    classification: record
                        .as_ref()
                        .map(|r| r.classification())
                        .unwrap_or(Classification::Unregistered),
                    vendor: record.and_then(|r| r.vendor),
                })
            })
            .collect()
    }

    /// Every event, or those inside `window`
    pub fn log_report(&self, window: Option<DateWindow>) -> Result<LogReport> {
        let events = match &window {
            Some(window) => {
                let (start, end) = window.bounds();
                self.log.between(&start, &end)?
            }
            None => self.log.all()?,
        };
        Ok(LogReport { window, events })
    }

    pub fn unregistered_summary(&self) -> Result<Vec<UnregisteredSummary>> {
        self.registry
            .database()
            .with_conn(queries::get_unregistered_summary)
    }

    pub fn devices_csv(&self) -> Result<String> {
        export_devices_csv(&self.registry.list()?)
    }

    pub fn devices_json(&self) -> Result<String> {
        export_devices_json(&self.registry.list()?)
    }
}
