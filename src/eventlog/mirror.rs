//! Plain-text copy of the event log

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::database::EventRecord;

const TEXT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appends human-readable lines to a text file
#[derive(Debug, Clone)]
pub struct FileLogMirror {
    path: PathBuf,
}

impl FileLogMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create event mirror directory {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open event mirror {}", self.path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("Failed to write event mirror {}", self.path.display()))
    }

    /// `<timestamp> | <description>`
    pub fn append_event(&self, event: &EventRecord) -> Result<()> {
        self.append(&format!(
            "{} | {}\n",
            event.timestamp.format(TEXT_TIME_FORMAT),
            event.description()
        ))
    }

    /// Block listing the devices one scan found, closed by a dashed rule
    pub fn append_scan<'a, I>(&self, at: DateTime<Utc>, devices: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut block = format!("Devices found at {}\n", at.format(TEXT_TIME_FORMAT));
        for (name, ip, mac) in devices {
            block.push_str(&format!("{} {} {}\n", name, ip, mac));
        }
        block.push_str(&"-".repeat(60));
        block.push('\n');
        self.append(&block)
    }
}
