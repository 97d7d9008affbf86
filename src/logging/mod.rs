//! Structured logging for MyNet
//!
//! Console output goes to stderr in compact form; a JSON copy is written to
//! daily rotating files under `~/.config/mynet/logs` (or `%APPDATA%\mynet\logs`).

pub mod macros;

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::APP_DIR_NAME;

const LOG_FILE_PREFIX: &str = "mynet.log";

/// Initialize the logging system
///
/// Set `RUST_LOG` to change the level (`RUST_LOG=debug`, `RUST_LOG=mynet=trace`).
/// Defaults to INFO. Calling this twice is harmless.
pub fn init_logging() -> Result<PathBuf> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = init_result {
        // Another subsystem or test already installed a global subscriber.
        if e.to_string().contains("already been set") {
            return Ok(log_dir);
        }
        return Err(anyhow!("Failed to install log subscriber: {}", e));
    }

    tracing::info!("Logging initialized. Log directory: {}", log_dir.display());

    Ok(log_dir)
}

fn get_log_directory() -> Result<PathBuf> {
    let base_dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir().ok_or_else(|| anyhow!("Could not find APPDATA directory"))?
    } else {
        dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?
    };

    Ok(base_dir.join(APP_DIR_NAME).join("logs"))
}
