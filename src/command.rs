use std::path::PathBuf;

use crate::report::DateWindow;
use crate::screens::Screen;

/// What to export and in which format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    Devices,
    Events,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Screen(Screen),
    Monitor,
    Devices,
    Report {
        window: Option<DateWindow>,
    },
    Unknown,
    Register {
        mac: String,
        name: String,
    },
    Import {
        path: PathBuf,
    },
    Export {
        target: ExportTarget,
        format: ExportFormat,
    },
    Interfaces,
    Help,
    Version,
}

impl AppCommand {
    /// Whether the command stops cleanly on Ctrl+C by itself.
    ///
    /// Every other command keeps the default SIGINT action and ends at once.
    pub fn handles_ctrl_c(&self) -> bool {
        matches!(self, AppCommand::Monitor)
    }
}
