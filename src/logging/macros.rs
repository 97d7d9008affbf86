//! Logging macros shared across the crate
//!
//! Thin wrappers over `tracing` so call sites read the same everywhere.

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

/// Log a logged presence event with the device MAC and event kind as fields
#[macro_export]
macro_rules! log_device_event {
    ($record:expr) => {
        tracing::info!(
            mac = %$record.mac,
            kind = %$record.kind,
            classification = %$record.classification,
            "{}",
            $record.description()
        )
    };
}
