//! CSV export functionality
//!
//! Export the device registry and the event log to CSV format

use crate::database::{DeviceRecord, EventRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::Writer;

fn format_time(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_default()
}

/// Export devices to CSV format
pub fn export_devices_csv(devices: &[DeviceRecord]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);

    writer.write_record([
        "MAC Address",
        "Device Name",
        "Status",
        "Last IP",
        "Vendor",
        "First Seen",
        "Last Seen",
    ])?;

    for device in devices {
        writer.write_record([
            device.mac.as_str(),
            device.display_name(),
            &device.classification().to_string(),
            device.last_ip.as_deref().unwrap_or("N/A"),
            device.vendor.as_deref().unwrap_or("Unknown"),
            &format_time(device.first_seen.as_ref()),
            &format_time(device.last_seen.as_ref()),
        ])?;
    }

    let csv_data = String::from_utf8(writer.into_inner()?)?;
    Ok(csv_data)
}

/// Export events to CSV, one row per event in append order
pub fn export_events_csv(events: &[EventRecord]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);

    writer.write_record([
        "Sequence",
        "Timestamp",
        "Event",
        "Status",
        "MAC Address",
        "IP Address",
        "Device Name",
        "Description",
    ])?;

    for event in events {
        writer.write_record([
            &event.id.to_string(),
            &event.timestamp.to_rfc3339(),
            &event.kind.to_string(),
            &event.classification.to_string(),
            &event.mac,
            event.ip.as_deref().unwrap_or(""),
            event.device_name.as_deref().unwrap_or(""),
            &event.description(),
        ])?;
    }

    let csv_data = String::from_utf8(writer.into_inner()?)?;
    Ok(csv_data)
}
