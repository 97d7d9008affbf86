//! MyNet: home network device monitor
//!
//! This crate watches the local network segment and keeps a record of who
//! is on it:
//! - Active ARP scanning for Layer 2 discovery
//! - Device registry with owner-registered names
//! - Append-only connect/disconnect event log in SQLite
//! - Background monitoring with optional text mirror and webhook alerts
//! - Log reports with CSV/JSON export
//! - The three static console screens

pub mod app;
pub mod cli_adapter;
pub mod command;
pub mod config;
pub mod database;
pub mod eventlog;
pub mod exports;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod network;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod screens;

mod cli;

pub use app::{
    AppCommandResult, AppContext, OutputHook, execute_command_typed, execute_command_with_context,
};
pub use command::AppCommand;
pub use config::Settings;
pub use database::{Classification, Database, DeviceRecord, EventKind, EventRecord};
pub use eventlog::{AlertNotifier, EventLog, FileLogMirror, NewEvent, PresenceTracker};
pub use models::*;
pub use monitor::{CycleSummary, Monitor, MonitorEvent, MonitorStatus};
pub use registry::{DeviceRegistry, KnownDevice};
pub use report::{DateWindow, LogReport, Reporter};
pub use scanner::{ArpScanner, DeviceScanner, ScanFuture};
pub use screens::Screen;

// Re-export logging macros for use across crate
pub use crate::logging::macros;
