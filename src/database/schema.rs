//! Database schema definitions
//!
//! Creates the registry, event log and scan tables

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Devices table: registry keyed by normalized MAC address
        CREATE TABLE IF NOT EXISTS devices (
            mac TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            registered INTEGER NOT NULL DEFAULT 0,
            first_seen TEXT,
            last_seen TEXT,
            last_ip TEXT,
            vendor TEXT
        );

        -- Events table: append-only connect/disconnect log
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            mac TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('connect', 'disconnect')),
            classification TEXT NOT NULL CHECK (classification IN ('registered', 'unregistered')),
            device_name TEXT,
            ip TEXT
        );

        -- Scans table: one row per completed monitor cycle
        CREATE TABLE IF NOT EXISTS scans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            interface_name TEXT NOT NULL,
            subnet TEXT NOT NULL,
            hosts_found INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0
        );

        CREATE TRIGGER IF NOT EXISTS events_no_update
        BEFORE UPDATE ON events
        BEGIN
            SELECT RAISE(ABORT, 'event log is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS events_no_delete
        BEFORE DELETE ON events
        BEGIN
            SELECT RAISE(ABORT, 'event log is append-only');
        END;

        CREATE INDEX IF NOT EXISTS idx_events_time ON events(timestamp);
        CREATE INDEX IF NOT EXISTS idx_events_mac ON events(mac);
        CREATE INDEX IF NOT EXISTS idx_devices_last_seen ON devices(last_seen);
        CREATE INDEX IF NOT EXISTS idx_scans_time ON scans(started_at);
        "#,
    )
    .context("Failed to create database tables")?;

    Ok(())
}
