//! Plain-text event log, one `[HH:MM:SS] message` line per event.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Append-only event log.
///
/// Writes are best-effort: an I/O failure is reported through tracing and
/// never returned to the caller.
pub struct EventLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl EventLog {
    /// Create an event log at `dir/file_name`, creating `dir` if needed.
    pub fn new(dir: &Path, file_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

        Ok(Self {
            path: dir.join(file_name),
            writer: None,
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the writer, opening the file on first use or after a failure.
    fn get_writer(&mut self) -> Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .with_context(|| format!("Failed to open log file: {:?}", self.path))?;

            self.writer = Some(BufWriter::new(file));
            debug!("Opened event log: {:?}", self.path);
        }

        self.writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No log file available"))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.get_writer()?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Append `message` stamped with the current local time.
    pub fn append(&mut self, message: &str) {
        self.append_at(Local::now(), message);
    }

    /// Append `message` stamped with `at`.
    pub fn append_at(&mut self, at: DateTime<Local>, message: &str) {
        info!(target: "idle_sentinel::event", "{}", message);

        let line = format_line(at, message);
        if let Err(e) = self.write_line(&line) {
            warn!("Failed to write event log line: {:#}", e);
            // Drop the handle so the next append reopens the file.
            self.writer = None;
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.writer {
            let _ = writer.flush();
        }
    }
}

fn format_line(at: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", at.format("%H:%M:%S"), message)
}
