//! Configuration for MyNet
//!
//! Compile-time defaults live in `pub const` items. Every value that makes sense
//! to tune at runtime has a matching accessor reading a `MYNET_*` environment
//! variable, clamped to a safe range.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum hosts to sweep (prevents scanning huge /16 subnets)
pub const MAX_SCAN_HOSTS: usize = 254;

// ====== ARP Adaptive Scan Configuration ======

/// Maximum total wait time for ARP replies (ms)
pub const ARP_MAX_WAIT_MS: u64 = 1200;

/// Interval to check for new replies (ms)
pub const ARP_CHECK_INTERVAL_MS: u64 = 150;

/// Stop early if no new hosts for this duration (ms)
pub const ARP_IDLE_TIMEOUT_MS: u64 = 300;

/// Number of ARP sweep rounds
pub const ARP_ROUNDS: u8 = 1;

/// Receiver keeps listening this long after the last round's wait
pub const ARP_RECEIVER_GRACE: Duration = Duration::from_millis(500);

/// Slack on top of the receiver deadline for opening the channel and sending
pub const ARP_PHASE_MARGIN: Duration = Duration::from_secs(5);

// ====== Monitoring Configuration ======

/// Default monitoring interval in seconds
pub const DEFAULT_MONITOR_INTERVAL: u64 = 60;

/// Minimum monitoring interval in seconds
pub const MIN_MONITOR_INTERVAL: u64 = 2;

/// Maximum monitoring interval in seconds
pub const MAX_MONITOR_INTERVAL: u64 = 3600;

/// Consecutive scans a device may be missing before a disconnect is logged
pub const DISCONNECT_AFTER_MISSES: u32 = 1;

// ====== Alerting ======

/// Timeout for the alert webhook POST
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application directory name used under the platform data/config dirs
pub const APP_DIR_NAME: &str = "mynet";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(name: &str, default: u64, min: u64, max: u64) -> u64 {
    match env_var(name).and_then(|v| v.parse::<u64>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u32(name: &str, default: u32, min: u32, max: u32) -> u32 {
    match env_var(name).and_then(|v| v.parse::<u32>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_usize(name: &str, default: usize, min: usize, max: usize) -> usize {
    match env_var(name).and_then(|v| v.parse::<usize>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u8(name: &str, default: u8, min: u8, max: u8) -> u8 {
    match env_var(name).and_then(|v| v.parse::<u8>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_var(name).map(PathBuf::from)
}

/// Runtime-tunable host cap for sweep target generation.
/// Env: `MYNET_MAX_SCAN_HOSTS`
pub fn max_scan_hosts() -> usize {
    env_parse_usize("MYNET_MAX_SCAN_HOSTS", MAX_SCAN_HOSTS, 8, 4096)
}

/// Runtime-tunable max ARP receive wait.
/// Env: `MYNET_ARP_MAX_WAIT_MS`
pub fn arp_max_wait_ms() -> u64 {
    env_parse_u64("MYNET_ARP_MAX_WAIT_MS", ARP_MAX_WAIT_MS, 100, 30_000)
}

/// Runtime-tunable ARP receiver poll interval.
/// Env: `MYNET_ARP_CHECK_INTERVAL_MS`
pub fn arp_check_interval_ms() -> u64 {
    env_parse_u64(
        "MYNET_ARP_CHECK_INTERVAL_MS",
        ARP_CHECK_INTERVAL_MS,
        10,
        5_000,
    )
}

/// Runtime-tunable ARP idle early-exit threshold.
/// Env: `MYNET_ARP_IDLE_TIMEOUT_MS`
pub fn arp_idle_timeout_ms() -> u64 {
    env_parse_u64("MYNET_ARP_IDLE_TIMEOUT_MS", ARP_IDLE_TIMEOUT_MS, 10, 10_000)
}

/// Runtime-tunable ARP round count.
/// Env: `MYNET_ARP_ROUNDS`
pub fn arp_rounds() -> u8 {
    env_parse_u8("MYNET_ARP_ROUNDS", ARP_ROUNDS, 1, 5)
}

/// How long the ARP receiver thread listens for `rounds` rounds of `max_wait_ms`
pub fn arp_receiver_deadline(max_wait_ms: u64, rounds: u8) -> Duration {
    Duration::from_millis(max_wait_ms) * u32::from(rounds.max(1)) + ARP_RECEIVER_GRACE
}

/// Upper bound for a whole ARP phase before it is abandoned.
///
/// Always longer than [`arp_receiver_deadline`] for the same settings.
pub fn arp_phase_timeout(max_wait_ms: u64, rounds: u8) -> Duration {
    arp_receiver_deadline(max_wait_ms, rounds) + ARP_PHASE_MARGIN
}

/// Runtime-tunable monitor interval.
/// Env: `MYNET_MONITOR_INTERVAL`
pub fn monitor_interval() -> u64 {
    env_parse_u64(
        "MYNET_MONITOR_INTERVAL",
        DEFAULT_MONITOR_INTERVAL,
        MIN_MONITOR_INTERVAL,
        MAX_MONITOR_INTERVAL,
    )
}

/// Runtime-tunable disconnect threshold.
/// Env: `MYNET_DISCONNECT_AFTER_MISSES`
pub fn disconnect_after_misses() -> u32 {
    env_parse_u32("MYNET_DISCONNECT_AFTER_MISSES", DISCONNECT_AFTER_MISSES, 1, 100)
}

/// Default SQLite database location.
///
/// Returns `<data dir>/mynet/mynet.db`, falling back to the working directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("mynet.db")
}

/// Runtime settings for one MyNet process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SQLite file holding the registry and event log
    pub db_path: PathBuf,
    /// Interface to sweep; `None` picks the best candidate
    pub interface: Option<String>,
    /// Seconds between monitor cycles
    pub interval_seconds: u64,
    pub disconnect_after_misses: u32,
    /// Plain-text mirror of the event log
    pub mirror_path: Option<PathBuf>,
    /// Webhook receiving unregistered-device alerts
    pub notify_url: Option<String>,
    /// JSON list of known devices imported at startup
    pub known_devices_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            interface: None,
            interval_seconds: DEFAULT_MONITOR_INTERVAL,
            disconnect_after_misses: DISCONNECT_AFTER_MISSES,
            mirror_path: None,
            notify_url: None,
            known_devices_path: None,
        }
    }
}

impl Settings {
    /// Build settings from `MYNET_*` environment variables.
    ///
    /// - `MYNET_DB_PATH`
    /// - `MYNET_INTERFACE`
    /// - `MYNET_MONITOR_INTERVAL`
    /// - `MYNET_DISCONNECT_AFTER_MISSES`
    /// - `MYNET_EVENT_LOG_FILE`
    /// - `MYNET_NOTIFY_URL`
    /// - `MYNET_KNOWN_DEVICES`
    pub fn from_env() -> Self {
        Self {
            db_path: env_path("MYNET_DB_PATH").unwrap_or_else(default_db_path),
            interface: env_var("MYNET_INTERFACE"),
            interval_seconds: monitor_interval(),
            disconnect_after_misses: disconnect_after_misses(),
            mirror_path: env_path("MYNET_EVENT_LOG_FILE"),
            notify_url: env_var("MYNET_NOTIFY_URL"),
            known_devices_path: env_path("MYNET_KNOWN_DEVICES"),
        }
    }

    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = db_path;
        self
    }

    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.interval_seconds = seconds.clamp(MIN_MONITOR_INTERVAL, MAX_MONITOR_INTERVAL);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_path_lives_under_app_dir() {
        let path = default_db_path();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("mynet.db"));
    }

    #[test]
    fn arp_phase_outlasts_receiver_at_every_clamp_edge() {
        for (max_wait_ms, rounds) in [(ARP_MAX_WAIT_MS, ARP_ROUNDS), (100, 1), (15_000, 1), (30_000, 5)] {
            let receiver = arp_receiver_deadline(max_wait_ms, rounds);
            let phase = arp_phase_timeout(max_wait_ms, rounds);
            assert!(phase > receiver, "{}ms x {} rounds", max_wait_ms, rounds);
            assert_eq!(phase - receiver, ARP_PHASE_MARGIN);
        }
        assert_eq!(arp_receiver_deadline(15_000, 1), Duration::from_millis(15_500));
        assert_eq!(arp_receiver_deadline(30_000, 5), Duration::from_millis(150_500));
    }

    #[test]
    fn unset_env_falls_back_to_default() {
        assert_eq!(
            env_parse_u64("MYNET_TEST_SURELY_UNSET_VAR", 42, 1, 100),
            42
        );
    }

    #[test]
    fn with_interval_clamps_to_bounds() {
        let settings = Settings::default().with_interval(0);
        assert_eq!(settings.interval_seconds, MIN_MONITOR_INTERVAL);

        let settings = Settings::default().with_interval(1_000_000);
        assert_eq!(settings.interval_seconds, MAX_MONITOR_INTERVAL);
    }
}
