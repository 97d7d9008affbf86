//! Database models
//!
//! Records for the device registry and the connection event log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device known to MyNet, keyed by normalized MAC address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: String,
    pub name: Option<String>,
    pub registered: bool,
    /// `None` for devices registered by hand but never sighted
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub vendor: Option<String>,
}

impl DeviceRecord {
    /// Name shown in reports; unnamed devices are "unknown"
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    pub fn classification(&self) -> Classification {
        if self.registered {
            Classification::Registered
        } else {
            Classification::Unregistered
        }
    }
}

/// Connection event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connect,
    Disconnect,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Connect => write!(f, "connect"),
            EventKind::Disconnect => write!(f, "disconnect"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(EventKind::Connect),
            "disconnect" => Ok(EventKind::Disconnect),
            _ => Err(format!("Unknown event kind: {}", s)),
        }
    }
}

/// Registration status of a device at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Registered,
    Unregistered,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Registered => write!(f, "registered"),
            Classification::Unregistered => write!(f, "unregistered"),
        }
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Classification::Registered),
            "unregistered" => Ok(Classification::Unregistered),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

/// Event record from the append-only log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence number assigned on append
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub mac: String,
    pub kind: EventKind,
    /// Registration status when the event happened
    pub classification: Classification,
    /// Device name when the event happened
    pub device_name: Option<String>,
    pub ip: Option<String>,
}

impl EventRecord {
    /// One-line description used by the text mirror and the alert webhook
    pub fn description(&self) -> String {
        let ip = self.ip.as_deref().unwrap_or("unknown");
        match (self.kind, self.classification) {
            (EventKind::Connect, Classification::Unregistered) => format!(
                "Unknown device detected on network. Device IP: {}, Device MAC: {}",
                ip, self.mac
            ),
            (EventKind::Connect, Classification::Registered) => format!(
                "{} connected. Device IP: {}, Device MAC: {}",
                self.device_name.as_deref().unwrap_or("Registered device"),
                ip,
                self.mac
            ),
            (EventKind::Disconnect, _) => format!(
                "{} disconnected. Last IP: {}, Device MAC: {}",
                self.device_name.as_deref().unwrap_or("unknown"),
                ip,
                self.mac
            ),
        }
    }
}

/// One completed monitor scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub interface_name: String,
    pub subnet: String,
    pub hosts_found: i64,
    pub duration_ms: i64,
}

/// Per-device connection totals for unregistered devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisteredSummary {
    pub mac: String,
    pub last_ip: Option<String>,
    pub vendor: Option<String>,
    pub connect_count: i64,
    pub last_seen: Option<DateTime<Utc>>,
}
