use std::fs::{self, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{MonitorError, Result};
use crate::outcome::Outcome;

pub const LOG_HEADER: &str = "Date,Time,Host,Success,PingTime,Ttl";

/// Folder created under the documents directory for session logs.
pub const LOG_DIR_NAME: &str = "pingLog";

/// `<YYYYMMDD-HHmmss>-<host>.csv`, the host reduced to file-safe characters.
pub fn session_file_name(started_at: NaiveDateTime, host: &str) -> String {
    let stamp = started_at.format("%Y%m%d-%H%M%S");
    let host: String = host
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();

    if host.is_empty() {
        format!("{stamp}.csv")
    } else {
        format!("{stamp}-{host}.csv")
    }
}

/// Formats one CSV row, without the trailing newline.
pub fn format_row(at: NaiveDateTime, host: &str, outcome: &Outcome) -> String {
    format!(
        "{},{},{},{},{}",
        at.format("%Y-%m-%d,%H:%M:%S"),
        host,
        if outcome.success { "True" } else { "False" },
        outcome.round_trip_millis,
        outcome.time_to_live,
    )
}

/// Append-only CSV log with one row per probe.
pub struct ResultLogger {
    path: PathBuf,
    writer: LineWriter<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ResultLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultLogger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ResultLogger {
    /// Opens the log for appending, creating it (and its folder) with a
    /// header line when it does not exist yet.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;
        let logger = Self::with_writer(path, file, is_new)?;

        log::info!("Logging probe results to {}", logger.path.display());
        Ok(logger)
    }

    /// Logs into an arbitrary writer; `path` is only used for reporting.
    pub fn from_writer(path: impl Into<PathBuf>, writer: impl Write + Send + 'static) -> Result<Self> {
        Self::with_writer(path.into(), writer, true)
    }

    fn with_writer(path: PathBuf, writer: impl Write + Send + 'static, header: bool) -> Result<Self> {
        let writer: Box<dyn Write + Send> = Box::new(writer);
        let mut logger = Self {
            path,
            writer: LineWriter::new(writer),
        };
        if header {
            logger.write_line(LOG_HEADER)?;
        }
        Ok(logger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends and flushes one row. A failure here ends the session.
    pub fn append(&mut self, at: NaiveDateTime, host: &str, outcome: &Outcome) -> Result<()> {
        let row = format_row(at, host, outcome);
        self.write_line(&row)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| MonitorError::LogWrite {
                path: self.path.clone(),
                source,
            })
    }
}

/// Accepts a fixed number of bytes, then fails every write.
#[cfg(test)]
pub(crate) struct FailAfter {
    remaining: usize,
}

#[cfg(test)]
impl FailAfter {
    pub(crate) fn new(remaining: usize) -> Self {
        Self { remaining }
    }
}

#[cfg(test)]
impl Write for FailAfter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::other("no space left on device"));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
