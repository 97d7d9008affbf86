//! Database query functions
//!
//! Registry upserts, event appends and read queries. Events are only ever
//! inserted; there is no update or delete query for them.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::models::*;

const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEVICE_COLUMNS: &str = "mac, name, registered, first_seen, last_seen, last_ip, vendor";
const EVENT_COLUMNS: &str = "id, timestamp, mac, kind, classification, device_name, ip";

/// Parameters used to append an event.
pub struct EventInsert<'a> {
    pub timestamp: DateTime<Utc>,
    pub mac: &'a str,
    pub kind: EventKind,
    pub classification: Classification,
    pub device_name: Option<&'a str>,
    pub ip: Option<&'a str>,
}

/// Parameters describing one sighting of a device.
pub struct SightingUpsert<'a> {
    pub mac: &'a str,
    pub ip: &'a str,
    pub seen_at: DateTime<Utc>,
    pub vendor: Option<&'a str>,
}

/// Format a timestamp the way it is stored (UTC, second precision)
pub fn to_db_time(ts: &DateTime<Utc>) -> String {
    ts.format(DB_TIME_FORMAT).to_string()
}

fn parse_datetime_column(s: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&s, DB_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_optional_datetime_column(
    s: Option<String>,
    column: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|raw| parse_datetime_column(raw, column)).transpose()
}

fn parse_text_column<T>(s: String, column: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceRecord> {
    Ok(DeviceRecord {
        mac: row.get(0)?,
        name: row.get(1)?,
        registered: row.get::<_, i64>(2)? != 0,
        first_seen: parse_optional_datetime_column(row.get(3)?, 3)?,
        last_seen: parse_optional_datetime_column(row.get(4)?, 4)?,
        last_ip: row.get(5)?,
        vendor: row.get(6)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: row.get(0)?,
        timestamp: parse_datetime_column(row.get(1)?, 1)?,
        mac: row.get(2)?,
        kind: parse_text_column(row.get(3)?, 3)?,
        classification: parse_text_column(row.get(4)?, 4)?,
        device_name: row.get(5)?,
        ip: row.get(6)?,
    })
}

// ====== Registry ======

/// Record a sighting: insert the device or advance its last-seen data.
///
/// `first_seen` only ever moves earlier and `last_seen` only ever moves later.
pub fn upsert_sighting(conn: &Connection, sighting: &SightingUpsert<'_>) -> Result<DeviceRecord> {
    let seen = to_db_time(&sighting.seen_at);
    conn.execute(
        r#"
        INSERT INTO devices (mac, first_seen, last_seen, last_ip, vendor)
        VALUES (?1, ?2, ?2, ?3, ?4)
        ON CONFLICT(mac) DO UPDATE SET
            first_seen = CASE
                WHEN devices.first_seen IS NULL OR excluded.first_seen < devices.first_seen
                THEN excluded.first_seen ELSE devices.first_seen END,
            last_ip = CASE
                WHEN devices.last_seen IS NULL OR excluded.last_seen >= devices.last_seen
                THEN excluded.last_ip ELSE devices.last_ip END,
            last_seen = CASE
                WHEN devices.last_seen IS NULL OR excluded.last_seen > devices.last_seen
                THEN excluded.last_seen ELSE devices.last_seen END,
            vendor = COALESCE(excluded.vendor, devices.vendor)
        "#,
        params![sighting.mac, seen, sighting.ip, sighting.vendor],
    )
    .context("Failed to record device sighting")?;

    get_device(conn, sighting.mac)?
        .with_context(|| format!("Device {} missing after sighting upsert", sighting.mac))
}

/// Register a device under `name`, creating it if it was never sighted
pub fn register_device(conn: &Connection, mac: &str, name: Option<&str>) -> Result<DeviceRecord> {
    conn.execute(
        r#"
        INSERT INTO devices (mac, name, registered) VALUES (?1, ?2, 1)
        ON CONFLICT(mac) DO UPDATE SET
            name = COALESCE(excluded.name, devices.name),
            registered = 1
        "#,
        params![mac, name],
    )
    .context("Failed to register device")?;

    get_device(conn, mac)?.with_context(|| format!("Device {} missing after register", mac))
}

/// Set the registration flag. Returns false if the device does not exist.
pub fn set_registered(conn: &Connection, mac: &str, registered: bool) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE devices SET registered = ?2 WHERE mac = ?1",
            params![mac, registered as i64],
        )
        .context("Failed to update registration")?;
    Ok(changed > 0)
}

/// Update device display name. Returns false if the device does not exist.
pub fn update_device_name(conn: &Connection, mac: &str, name: Option<&str>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE devices SET name = ?2 WHERE mac = ?1",
            params![mac, name],
        )
        .context("Failed to update device name")?;
    Ok(changed > 0)
}

/// Get device by MAC address
pub fn get_device(conn: &Connection, mac: &str) -> Result<Option<DeviceRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM devices WHERE mac = ?1", DEVICE_COLUMNS),
        params![mac],
        device_from_row,
    )
    .optional()
    .context("Failed to load device")
}

/// Get all devices ordered by MAC
pub fn get_all_devices(conn: &Connection) -> Result<Vec<DeviceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM devices ORDER BY mac",
        DEVICE_COLUMNS
    ))?;
    let devices = stmt
        .query_map([], device_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(devices)
}

/// Get registered devices ordered by MAC
pub fn get_registered_devices(conn: &Connection) -> Result<Vec<DeviceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM devices WHERE registered = 1 ORDER BY mac",
        DEVICE_COLUMNS
    ))?;
    let devices = stmt
        .query_map([], device_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(devices)
}

// ====== Event log ======

/// Append an event and return its sequence id
pub fn insert_event(conn: &Connection, event: &EventInsert<'_>) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO events (timestamp, mac, kind, classification, device_name, ip)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            to_db_time(&event.timestamp),
            event.mac,
            event.kind.to_string(),
            event.classification.to_string(),
            event.device_name,
            event.ip,
        ],
    )
    .context("Failed to append event")?;

    Ok(conn.last_insert_rowid())
}

/// Get one event by sequence id
pub fn get_event(conn: &Connection, id: i64) -> Result<Option<EventRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
        params![id],
        event_from_row,
    )
    .optional()
    .context("Failed to load event")
}

/// Get all events in append order
pub fn get_all_events(conn: &Connection) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM events ORDER BY id", EVENT_COLUMNS))?;
    let events = stmt
        .query_map([], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Get events with `start <= timestamp <= end`, in append order
pub fn get_events_between(
    conn: &Connection,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY id",
        EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map(params![to_db_time(start), to_db_time(end)], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Get events for one device, in append order
pub fn get_events_for_device(conn: &Connection, mac: &str) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE mac = ?1 ORDER BY id",
        EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map(params![mac], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Get the `limit` most recent events, oldest first
pub fn get_latest_events(conn: &Connection, limit: i64) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM (SELECT {} FROM events ORDER BY id DESC LIMIT ?1) ORDER BY id",
        EVENT_COLUMNS, EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map(params![limit], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Most recently appended event
pub fn get_last_event(conn: &Connection) -> Result<Option<EventRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM events ORDER BY id DESC LIMIT 1", EVENT_COLUMNS),
        [],
        event_from_row,
    )
    .optional()
    .context("Failed to load last event")
}

/// Newest event of each device, ordered by MAC
pub fn get_last_event_per_device(conn: &Connection) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE id IN (SELECT MAX(id) FROM events GROUP BY mac) ORDER BY mac",
        EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map([], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Number of events in the log
pub fn count_events(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .context("Failed to count events")
}

/// Unregistered devices with their connect counts, most active first
pub fn get_unregistered_summary(conn: &Connection) -> Result<Vec<UnregisteredSummary>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT d.mac, d.last_ip, d.vendor, d.last_seen,
               (SELECT COUNT(*) FROM events e WHERE e.mac = d.mac AND e.kind = 'connect') AS connects
        FROM devices d
        WHERE d.registered = 0
        ORDER BY connects DESC, d.mac
        "#,
    )?;

    let summary = stmt
        .query_map([], |row| {
            Ok(UnregisteredSummary {
                mac: row.get(0)?,
                last_ip: row.get(1)?,
                vendor: row.get(2)?,
                last_seen: parse_optional_datetime_column(row.get(3)?, 3)?,
                connect_count: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(summary)
}

// ====== Scans ======

/// Insert a completed scan record
pub fn insert_scan(
    conn: &Connection,
    started_at: &DateTime<Utc>,
    interface_name: &str,
    subnet: &str,
    hosts_found: usize,
    duration_ms: u64,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO scans (started_at, interface_name, subnet, hosts_found, duration_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            to_db_time(started_at),
            interface_name,
            subnet,
            hosts_found as i64,
            duration_ms as i64,
        ],
    )
    .context("Failed to insert scan")?;

    Ok(conn.last_insert_rowid())
}

/// Most recent completed scan
pub fn get_latest_scan(conn: &Connection) -> Result<Option<ScanRecord>> {
    conn.query_row(
        r#"
        SELECT id, started_at, interface_name, subnet, hosts_found, duration_ms
        FROM scans ORDER BY id DESC LIMIT 1
        "#,
        [],
        |row| {
            Ok(ScanRecord {
                id: row.get(0)?,
                started_at: parse_datetime_column(row.get(1)?, 1)?,
                interface_name: row.get(2)?,
                subnet: row.get(3)?,
                hosts_found: row.get(4)?,
                duration_ms: row.get(5)?,
            })
        },
    )
    .optional()
    .context("Failed to load latest scan")
}
