use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cli::{usage_text, version_text};
use crate::command::{AppCommand, ExportFormat, ExportTarget};
use crate::config::Settings;
use crate::database::{Classification, Database, DeviceRecord, UnregisteredSummary};
use crate::eventlog::{AlertNotifier, EventLog, FileLogMirror, PresenceTracker};
use crate::monitor::{Monitor, MonitorEvent, MonitorStatus};
use crate::network::list_valid_interfaces;
use crate::registry::DeviceRegistry;
use crate::report::{
    ActivityRow, LogReport, Reporter, render_device_table, render_unregistered_table,
};
use crate::scanner::{ArpScanner, DeviceScanner};
use crate::screens::Screen;

pub type OutputHook = Arc<dyn Fn(&str) + Send + Sync>;

const CANCEL_POLL: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct AppContext {
    settings: Settings,
    output_hook: OutputHook,
    scanner: Option<Arc<dyn DeviceScanner>>,
    cancel_flag: Arc<AtomicBool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum AppCommandResult {
    HelpText(String),
    VersionText(String),
    ScreenShown,
    Interfaces(Vec<String>),
    Devices(Vec<ActivityRow>),
    Report(LogReport),
    Unregistered(Vec<UnregisteredSummary>),
    Registered(DeviceRecord),
    Imported(Vec<DeviceRecord>),
    Export(String),
    MonitorStopped(MonitorStatus),
}

impl Default for AppContext {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppContext {
    pub fn from_env() -> Self {
        Self::new(Settings::from_env())
    }

    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            output_hook: Arc::new(|line| println!("{}", line)),
            scanner: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_output_hook(mut self, output_hook: OutputHook) -> Self {
        self.output_hook = output_hook;
        self
    }

    /// Use `scanner` instead of an ARP scanner on the configured interface
    pub fn with_scanner(mut self, scanner: Arc<dyn DeviceScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn emit_line(&self, line: &str) {
        (self.output_hook)(line);
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    fn scanner(&self) -> Arc<dyn DeviceScanner> {
        match &self.scanner {
            Some(scanner) => Arc::clone(scanner),
            None => Arc::new(ArpScanner::new(self.settings.interface.clone())),
        }
    }

    fn open_stores(&self) -> Result<(DeviceRegistry, EventLog)> {
        let db = Database::new(self.settings.db_path.clone())?;
        let registry = DeviceRegistry::open(db.clone());
        Ok((registry, EventLog::open(db)))
    }

    /// Monitor wired to the configured mirror, notifier and known devices.
    ///
    /// Presence resumes from the log so a restart does not reconnect
    /// devices that never left.
    fn build_monitor(&self) -> Result<Monitor> {
        let (registry, log) = self.open_stores()?;

        if let Some(path) = &self.settings.known_devices_path {
            registry.import_known_devices(path)?;
        }

        let tracker = PresenceTracker::resume(&log, self.settings.disconnect_after_misses)?;
        let mut monitor = Monitor::new(self.scanner(), registry, log).with_tracker(tracker);
        if let Some(path) = &self.settings.mirror_path {
            monitor = monitor.with_mirror(FileLogMirror::new(path));
        }
        if let Some(url) = &self.settings.notify_url {
            monitor = monitor.with_notifier(AlertNotifier::new(url.clone())?);
        }
        Ok(monitor)
    }
}

/// Execute a pre-parsed command. This is reusable for non-CLI entrypoints.
pub async fn execute_command(command: AppCommand) -> Result<()> {
    let context = AppContext::from_env();
    execute_command_with_context(command, &context).await
}

/// Execute a pre-parsed command with an explicit execution context.
pub async fn execute_command_with_context(command: AppCommand, context: &AppContext) -> Result<()> {
    let result = execute_command_typed(command, context).await?;
    emit_command_result(&result, context)
}

/// Execute a pre-parsed command and return a strongly-typed result payload.
pub async fn execute_command_typed(
    command: AppCommand,
    context: &AppContext,
) -> Result<AppCommandResult> {
    match command {
        AppCommand::Help => Ok(AppCommandResult::HelpText(usage_text())),
        AppCommand::Version => Ok(AppCommandResult::VersionText(version_text())),
        AppCommand::Interfaces => Ok(AppCommandResult::Interfaces(list_valid_interfaces())),
        AppCommand::Screen(screen) => {
            show_screen(screen).await?;
            Ok(AppCommandResult::ScreenShown)
        }
        AppCommand::Devices => {
            let monitor = context.build_monitor()?;
            monitor.run_cycle().await?;
            let reporter = Reporter::new(monitor.registry().clone(), monitor.event_log().clone());
            Ok(AppCommandResult::Devices(
                reporter.current_activity(&monitor.online().await)?,
            ))
        }
        AppCommand::Monitor => Ok(AppCommandResult::MonitorStopped(
            monitor_until_cancelled(context).await?,
        )),
        AppCommand::Report { window } => {
            let (registry, log) = context.open_stores()?;
            Ok(AppCommandResult::Report(
                Reporter::new(registry, log).log_report(window)?,
            ))
        }
        AppCommand::Unknown => {
            let (registry, log) = context.open_stores()?;
            Ok(AppCommandResult::Unregistered(
                Reporter::new(registry, log).unregistered_summary()?,
            ))
        }
        AppCommand::Register { mac, name } => {
            let (registry, _) = context.open_stores()?;
            Ok(AppCommandResult::Registered(
                registry.register(&mac, Some(&name))?,
            ))
        }
        AppCommand::Import { path } => {
            let (registry, _) = context.open_stores()?;
            Ok(AppCommandResult::Imported(
                registry.import_known_devices(&path)?,
            ))
        }
        AppCommand::Export { target, format } => {
            let (registry, log) = context.open_stores()?;
            let reporter = Reporter::new(registry, log);
            let output = match (target, format) {
                (ExportTarget::Devices, ExportFormat::Csv) => reporter.devices_csv()?,
                (ExportTarget::Devices, ExportFormat::Json) => reporter.devices_json()?,
                (ExportTarget::Events, ExportFormat::Csv) => reporter.log_report(None)?.to_csv()?,
                (ExportTarget::Events, ExportFormat::Json) => {
                    reporter.log_report(None)?.to_json()?
                }
            };
            Ok(AppCommandResult::Export(output))
        }
    }
}

async fn show_screen(screen: Screen) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        screen.run(&mut stdin.lock(), &mut stdout)
    })
    .await
    .context("Screen task failed")?
}

async fn monitor_until_cancelled(context: &AppContext) -> Result<MonitorStatus> {
    let monitor = context.build_monitor()?;
    let output = context.clone();

    monitor
        .start(
            move |event| {
                if let Some(line) = describe_monitor_event(&event) {
                    output.emit_line(&line);
                }
            },
            Some(context.settings().interval_seconds),
        )
        .await?;

    while !context.is_cancelled() {
        tokio::time::sleep(CANCEL_POLL).await;
    }

    monitor.stop();
    Ok(monitor.status().await)
}

/// Console line for a monitor event; routine events print nothing
pub fn describe_monitor_event(event: &MonitorEvent) -> Option<String> {
    match event {
        MonitorEvent::MonitoringStarted { interval_seconds } => Some(format!(
            "Monitoring every {}s. Press Ctrl+C to stop.",
            interval_seconds
        )),
        MonitorEvent::MonitoringStopped => Some("Monitoring stopped.".to_string()),
        MonitorEvent::ScanStarted { .. } => None,
        MonitorEvent::ScanCompleted {
            scan_number,
            hosts_found,
            events_logged,
            ..
        } => Some(format!(
            "Scan #{}: {} devices online, {} new events",
            scan_number, hosts_found, events_logged
        )),
        MonitorEvent::DeviceConnected {
            mac,
            ip,
            name,
            classification,
        } => Some(match classification {
            Classification::Unregistered => format!(
                "Unknown device detected on network. Device IP: {}, Device MAC: {}",
                ip.as_deref().unwrap_or("unknown"),
                mac
            ),
            Classification::Registered => format!(
                "{} connected ({})",
                name.as_deref().unwrap_or(mac),
                ip.as_deref().unwrap_or("unknown")
            ),
        }),
        MonitorEvent::DeviceDisconnected { mac, name, .. } => Some(format!(
            "{} disconnected",
            name.as_deref().unwrap_or(mac)
        )),
        MonitorEvent::MonitoringError { message } => {
            Some(format!("Monitoring error: {}", message))
        }
    }
}

fn emit_command_result(result: &AppCommandResult, context: &AppContext) -> Result<()> {
    match result {
        AppCommandResult::HelpText(text) | AppCommandResult::VersionText(text) => {
            context.emit_line(text);
        }
        AppCommandResult::ScreenShown => {}
        AppCommandResult::Interfaces(interfaces) => {
            if interfaces.is_empty() {
                context.emit_line("No valid IPv4 network interfaces found.");
            } else {
                for interface in interfaces {
                    context.emit_line(interface);
                }
            }
        }
        AppCommandResult::Devices(rows) => {
            context.emit_line(render_device_table(rows).trim_end());
        }
        AppCommandResult::Report(report) => {
            context.emit_line(report.render().trim_end());
        }
        AppCommandResult::Unregistered(summary) => {
            context.emit_line(render_unregistered_table(summary).trim_end());
        }
        AppCommandResult::Registered(device) => {
            context.emit_line(&format!(
                "Registered {} as '{}'",
                device.mac,
                device.display_name()
            ));
        }
        AppCommandResult::Imported(devices) => {
            context.emit_line(&format!("Imported {} known devices", devices.len()));
        }
        AppCommandResult::Export(output) => {
            context.emit_line(output.trim_end());
        }
        AppCommandResult::MonitorStopped(status) => {
            let output = serde_json::to_string_pretty(status)
                .context("Failed to serialize monitor status")?;
            context.emit_line(&output);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_connect_uses_alert_wording() {
        let line = describe_monitor_event(&MonitorEvent::DeviceConnected {
            mac: "da:a1:19:00:00:01".to_string(),
            ip: Some("192.168.1.77".to_string()),
            name: None,
            classification: Classification::Unregistered,
        })
        .unwrap();
        assert_eq!(
            line,
            "Unknown device detected on network. Device IP: 192.168.1.77, Device MAC: da:a1:19:00:00:01"
        );
    }

    #[test]
    fn scan_started_is_silent() {
        assert!(describe_monitor_event(&MonitorEvent::ScanStarted { scan_number: 1 }).is_none());
    }
}
