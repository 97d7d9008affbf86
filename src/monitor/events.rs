//! Monitor events and status
//!
//! Event types handed to the monitor callback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Classification;

/// Events emitted while monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MonitorEvent {
    /// Monitoring loop started
    MonitoringStarted { interval_seconds: u64 },

    /// Monitoring loop stopped
    MonitoringStopped,

    ScanStarted { scan_number: u32 },

    ScanCompleted {
        scan_number: u32,
        hosts_found: usize,
        events_logged: usize,
        duration_ms: u64,
    },

    /// A device joined the network and the event was logged
    DeviceConnected {
        mac: String,
        ip: Option<String>,
        name: Option<String>,
        classification: Classification,
    },

    /// A device left the network and the event was logged
    DeviceDisconnected {
        mac: String,
        last_ip: Option<String>,
        name: Option<String>,
        classification: Classification,
    },

    /// Scan or logging failure; monitoring continues
    MonitoringError { message: String },
}

/// Monitor status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub is_running: bool,
    pub interval_seconds: u64,
    pub scan_count: u32,
    pub last_scan_time: Option<DateTime<Utc>>,
    pub devices_online: usize,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            interval_seconds: crate::config::DEFAULT_MONITOR_INTERVAL,
            scan_count: 0,
            last_scan_time: None,
            devices_online: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = MonitorEvent::DeviceConnected {
            mac: "aa:00:00:00:00:01".to_string(),
            ip: Some("192.168.1.10".to_string()),
            name: None,
            classification: Classification::Unregistered,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "DeviceConnected");
        assert_eq!(json["data"]["classification"], "unregistered");
    }

    #[test]
    fn default_status_is_idle() {
        let status = MonitorStatus::default();
        assert!(!status.is_running);
        assert_eq!(status.interval_seconds, crate::config::DEFAULT_MONITOR_INTERVAL);
    }
}
