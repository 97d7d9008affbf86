//! JSON export functionality
//!
//! Export the event log and device registry to JSON format

use crate::database::{DeviceRecord, EventRecord};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// Event log export format
#[derive(Debug, Serialize)]
pub struct EventLogExport<'a> {
    pub export_date: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_events: usize,
    pub events: Vec<EventEntry<'a>>,
}

/// One exported event with its rendered description
#[derive(Debug, Serialize)]
pub struct EventEntry<'a> {
    #[serde(flatten)]
    pub event: &'a EventRecord,
    pub description: String,
}

/// Device registry export format
#[derive(Debug, Serialize)]
pub struct DeviceExport<'a> {
    pub export_date: String,
    pub total_devices: usize,
    pub registered_devices: usize,
    pub devices: &'a [DeviceRecord],
}

/// Export events to JSON, optionally tagged with the date window they cover
pub fn export_events_json(
    events: &[EventRecord],
    window: Option<(NaiveDate, NaiveDate)>,
) -> Result<String> {
    let export = EventLogExport {
        export_date: Utc::now().to_rfc3339(),
        start_date: window.map(|(start, _)| start),
        end_date: window.map(|(_, end)| end),
        total_events: events.len(),
        events: events
            .iter()
            .map(|event| EventEntry {
                event,
                description: event.description(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&export)?)
}

/// Export devices to JSON
pub fn export_devices_json(devices: &[DeviceRecord]) -> Result<String> {
    let export = DeviceExport {
        export_date: Utc::now().to_rfc3339(),
        total_devices: devices.len(),
        registered_devices: devices.iter().filter(|d| d.registered).count(),
        devices,
    };

    Ok(serde_json::to_string_pretty(&export)?)
}
