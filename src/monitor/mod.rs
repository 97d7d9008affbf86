//! Real-time network monitoring
//!
//! Repeated scans turned into logged connect/disconnect events.

pub mod events;
pub mod watcher;

pub use events::{MonitorEvent, MonitorStatus};
pub use watcher::{CycleSummary, EventCallback, Monitor};
