use anyhow::{Result, anyhow};
use std::path::PathBuf;

use crate::command::{AppCommand, ExportFormat, ExportTarget};
use crate::report::DateWindow;
use crate::screens::Screen;

pub(crate) fn version_text() -> String {
    format!("mynet {}", env!("CARGO_PKG_VERSION"))
}

pub(crate) fn usage_text() -> String {
    format!(
        "{version}
MyNet home network protection

Usage:
  mynet welcome                    Show the welcome screen
  mynet info                       Show the information/help screen
  mynet log                        Show the log report screen
  mynet monitor                    Scan continuously and log connect/disconnect events
  mynet devices                    Scan once and list devices on the network
  mynet report [START END]         Print the event log, optionally for YYYY-MM-DD dates
  mynet unknown                    Summarize unregistered devices ever seen
  mynet register <MAC> <NAME>      Register a device under a name
  mynet import <FILE>              Register every device in a known-devices JSON file
  mynet export <devices|events> <csv|json>
  mynet interfaces                 List usable network interfaces
  mynet help | --help
  mynet version | --version

Environment:
  MYNET_DB_PATH, MYNET_INTERFACE, MYNET_MONITOR_INTERVAL,
  MYNET_DISCONNECT_AFTER_MISSES, MYNET_EVENT_LOG_FILE, MYNET_NOTIFY_URL,
  MYNET_KNOWN_DEVICES, RUST_LOG",
        version = version_text()
    )
}

fn usage_error(message: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("{}\n\n{}", message, usage_text())
}

fn expect_no_more(rest: &[String], command: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(usage_error(format!(
            "Unexpected argument for {}: {}",
            command,
            rest.join(" ")
        )))
    }
}

pub(crate) fn parse_cli_args<I, S>(args: I) -> Result<AppCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = args.into_iter();
    let _program_name = iter.next();

    let Some(command) = iter.next().map(|arg| arg.as_ref().to_string()) else {
        return Ok(AppCommand::Screen(Screen::Welcome));
    };
    let rest: Vec<String> = iter.map(|arg| arg.as_ref().to_string()).collect();

    let parsed = match command.as_str() {
        "welcome" => AppCommand::Screen(Screen::Welcome),
        "info" => AppCommand::Screen(Screen::InfoHelp),
        "log" => AppCommand::Screen(Screen::LogReport),
        "monitor" => AppCommand::Monitor,
        "devices" => AppCommand::Devices,
        "unknown" => AppCommand::Unknown,
        "interfaces" => AppCommand::Interfaces,
        "help" | "-h" | "--help" => AppCommand::Help,
        "version" | "-V" | "--version" => AppCommand::Version,
        "report" => {
            return match rest.as_slice() {
                [] => Ok(AppCommand::Report { window: None }),
                [start, end] => Ok(AppCommand::Report {
                    window: Some(DateWindow::parse(start, end)?),
                }),
                _ => Err(usage_error("report takes either no dates or START and END")),
            };
        }
        "register" => {
            return match rest.as_slice() {
                [mac, name @ ..] if !name.is_empty() => Ok(AppCommand::Register {
                    mac: mac.clone(),
                    name: name.join(" "),
                }),
                _ => Err(usage_error("register needs a MAC address and a name")),
            };
        }
        "import" => {
            return match rest.as_slice() {
                [path] => Ok(AppCommand::Import {
                    path: PathBuf::from(path),
                }),
                _ => Err(usage_error("import needs exactly one file path")),
            };
        }
        "export" => {
            let [target, format] = rest.as_slice() else {
                return Err(usage_error("export needs a target and a format"));
            };
            let target = match target.as_str() {
                "devices" => ExportTarget::Devices,
                "events" => ExportTarget::Events,
                other => return Err(usage_error(format!("Unknown export target: {}", other))),
            };
            let format = match format.as_str() {
                "csv" => ExportFormat::Csv,
                "json" => ExportFormat::Json,
                other => return Err(usage_error(format!("Unknown export format: {}", other))),
            };
            return Ok(AppCommand::Export { target, format });
        }
        other => return Err(usage_error(format!("Unknown command: {}", other))),
    };

    expect_no_more(&rest, &command)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppCommand> {
        parse_cli_args(std::iter::once("mynet").chain(args.iter().copied()))
    }

    #[test]
    fn no_arguments_shows_welcome() {
        assert_eq!(parse(&[]).unwrap(), AppCommand::Screen(Screen::Welcome));
    }

    #[test]
    fn screens_map_to_commands() {
        assert_eq!(parse(&["info"]).unwrap(), AppCommand::Screen(Screen::InfoHelp));
        assert_eq!(parse(&["log"]).unwrap(), AppCommand::Screen(Screen::LogReport));
    }

    #[test]
    fn report_with_and_without_window() {
        assert_eq!(
            parse(&["report"]).unwrap(),
            AppCommand::Report { window: None }
        );

        let AppCommand::Report { window: Some(window) } =
            parse(&["report", "2024-05-01", "2024-05-03"]).unwrap()
        else {
            panic!("expected windowed report");
        };
        assert_eq!(window.start.to_string(), "2024-05-01");

        assert!(parse(&["report", "2024-05-03", "2024-05-01"]).is_err());
        assert!(parse(&["report", "2024-05-03"]).is_err());
    }

    #[test]
    fn register_joins_name_words() {
        assert_eq!(
            parse(&["register", "aa:bb:cc:dd:ee:ff", "Living", "Room", "TV"]).unwrap(),
            AppCommand::Register {
                mac: "aa:bb:cc:dd:ee:ff".to_string(),
                name: "Living Room TV".to_string(),
            }
        );
        assert!(parse(&["register", "aa:bb:cc:dd:ee:ff"]).is_err());
    }

    #[test]
    fn export_validates_target_and_format() {
        assert_eq!(
            parse(&["export", "events", "csv"]).unwrap(),
            AppCommand::Export {
                target: ExportTarget::Events,
                format: ExportFormat::Csv,
            }
        );
        assert!(parse(&["export", "events", "xml"]).is_err());
        assert!(parse(&["export", "alerts", "json"]).is_err());
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        let err = parse(&["scan"]).unwrap_err();
        assert!(err.to_string().contains("Unknown command: scan"));
        assert!(parse(&["devices", "now"]).is_err());
        assert_eq!(parse(&["--version"]).unwrap(), AppCommand::Version);
    }
}
