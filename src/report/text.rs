//! Fixed-width console tables

use std::fmt::Write;

use super::{ActivityRow, LogReport};
use crate::database::UnregisteredSummary;

const RULE_WIDTH: usize = 60;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const NO_DEVICES: &str = "No devices found on the network.";
pub const END_OF_LOG: &str = "--End of Log--";

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Devices currently on the network: name, IP and MAC in 20-char columns
pub fn render_device_table(rows: &[ActivityRow]) -> String {
    if rows.is_empty() {
        return format!("{}\n", NO_DEVICES);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Devices found on the local network:");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{:<20} {:<20} {}", "Device Name", "IP Address", "MAC Address");
    let _ = writeln!(out, "{}", rule());
    for row in rows {
        let _ = writeln!(out, "{:<20} {:<20} {}", row.name, row.ip, row.mac);
    }
    out
}

/// Event log table, closed by the end-of-log marker
pub fn render_log_table(report: &LogReport) -> String {
    let mut out = String::new();
    match &report.window {
        Some(window) => {
            let _ = writeln!(out, "Event Log From {} to {}:", window.start, window.end);
        }
        None => {
            let _ = writeln!(out, "Event Log:");
        }
    }
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{:<20} | {:<40}", "Timestamp", "Event Description");
    let _ = writeln!(out, "{}", rule());
    for event in &report.events {
        let _ = writeln!(
            out,
            "{:<20} | {:<40}",
            event.timestamp.format(TIME_FORMAT).to_string(),
            event.description()
        );
    }
    let _ = writeln!(out, "{}", END_OF_LOG);
    out
}

pub fn render_unregistered_table(summary: &[UnregisteredSummary]) -> String {
    if summary.is_empty() {
        return "No unregistered devices have been seen.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Unregistered devices seen on the network:");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(
        out,
        "{:<20} {:<20} {:<10} {}",
        "MAC Address", "Last IP", "Connects", "Vendor"
    );
    let _ = writeln!(out, "{}", rule());
    for entry in summary {
        let _ = writeln!(
            out,
            "{:<20} {:<20} {:<10} {}",
            entry.mac,
            entry.last_ip.as_deref().unwrap_or("N/A"),
            entry.connect_count,
            entry.vendor.as_deref().unwrap_or("Unknown")
        );
    }
    out
}
