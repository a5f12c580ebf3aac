//! Append-only, size-bounded crash log.
//!
//! One timestamped record per write; once the file grows past the
//! configured maximum the whole file is deleted and writing resumes
//! from empty (truncate-on-exceed, not rolling segments). All failures
//! on the write path are swallowed and routed to stderr, since the
//! caller may already be mid-crash with nothing to fall back on.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use directories::ProjectDirs;
use parking_lot::Mutex;
use thiserror::Error;

/// Upper bound on the log file size before truncate-on-exceed rotation.
pub const MAX_LOG_FILE_SIZE: u64 = 50_000_000;

/// Errors on the log write path. These never escape [`Logger::log`].
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to open log file: {0}")]
    Open(#[source] std::io::Error),

    #[error("Failed to append to log file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to rotate log file: {0}")]
    Rotate(#[source] std::io::Error),
}

/// Severity of a record. The file format is level-implicit; the level
/// only steers the console echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn echo(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// The well-known per-install location of the log file.
pub fn default_log_path() -> PathBuf {
    ProjectDirs::from("com", "crashwatch", "crashwatch")
        .map(|dirs| dirs.data_dir().join("app.log"))
        .unwrap_or_else(|| PathBuf::from("/tmp/crashwatch/app.log"))
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Persistent log sink for crash reports and diagnostics.
#[derive(Debug)]
pub struct Logger {
    path: PathBuf,
    max_size: u64,
    /// Serializes check-rotate-append so concurrent writers cannot
    /// interleave within a record.
    handle: Mutex<()>,
}

impl Logger {
    /// A logger writing to `path` with the production size bound.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_size(path, MAX_LOG_FILE_SIZE)
    }

    /// A logger with a custom size bound.
    pub fn with_max_size(path: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            path: path.into(),
            max_size,
            handle: Mutex::new(()),
        }
    }

    /// The process-wide logger at the well-known path.
    pub fn global() -> &'static Logger {
        GLOBAL.get_or_init(|| Logger::new(default_log_path()))
    }

    /// Pins the process-wide logger to `path` instead of the default.
    /// Returns false if the global logger was already created.
    pub fn init_global(path: impl Into<PathBuf>) -> bool {
        GLOBAL.set(Logger::new(path)).is_ok()
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a timestamped record and echoes it through the `log`
    /// facade. Total: write failures are reported to stderr, never
    /// returned.
    pub fn log(&self, level: LogLevel, message: &str) {
        log::log!(level.echo(), "{}", message);

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("{}: {}\n", timestamp, message);
        if let Err(err) = self.append(&line) {
            eprintln!("crashwatch logger: {}", err);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn append(&self, line: &str) -> Result<(), LoggerError> {
        let _guard = self.handle.lock();

        if let Ok(meta) = fs::metadata(&self.path) {
            if meta.len() > self.max_size {
                self.remove_log_file().map_err(LoggerError::Rotate)?;
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(LoggerError::Open)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(LoggerError::Open)?;
        file.write_all(line.as_bytes()).map_err(LoggerError::Write)
    }

    /// Deletes the oversized log file. Refuses to unlink through a
    /// symlink.
    fn remove_log_file(&self) -> std::io::Result<()> {
        let meta = fs::symlink_metadata(&self.path)?;
        if meta.is_symlink() {
            log::warn!("Log path is a symlink, refusing to remove");
            return Ok(());
        }
        log::warn!(
            "Log file exceeds {} bytes, truncating",
            self.max_size
        );
        fs::remove_file(&self.path)
    }

    /// Reads the tail of the log. Files of at most `max_lines` lines
    /// come back unchanged; larger files come back as the most recent
    /// `3 * max_lines` lines, in original order. Read failures yield a
    /// fixed placeholder instead of an error.
    pub fn read_tail(&self, max_lines: usize) -> String {
        let _guard = self.handle.lock();

        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let lines: Vec<&str> = content.lines().collect();
                if lines.len() > max_lines {
                    let window = max_lines.saturating_mul(3);
                    let start = lines.len().saturating_sub(window);
                    lines[start..].join("\n")
                } else {
                    content
                }
            }
            Err(err) => {
                log::warn!("Failed to read log data: {}", err);
                "Failed to load log data.".to_string()
            }
        }
    }

    /// Truncates the log file to zero bytes, creating it if absent.
    pub fn clear(&self) {
        let _guard = self.handle.lock();

        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log::error!("Error clearing log file: {}", err);
                return;
            }
        }
        if let Err(err) = File::create(&self.path) {
            log::error!("Error clearing log file: {}", err);
        }
    }

    /// Human-readable snapshot of the log file for operational
    /// debugging. Each field degrades independently on read failure.
    pub fn diagnostics(&self) -> String {
        let mut out = vec!["=== Logger Diagnostics ===".to_string()];
        out.push(format!("File Path: {}", self.path.display()));

        let exists = self.path.exists();
        out.push(format!("File Exists: {}", exists));

        if exists {
            match fs::metadata(&self.path) {
                Ok(meta) => {
                    out.push(format!("File Size: {} bytes", meta.len()));
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        out.push(format!(
                            "Permissions: {:o}",
                            meta.permissions().mode() & 0o7777
                        ));
                    }
                    match meta.modified() {
                        Ok(time) => {
                            let stamp = chrono::DateTime::<chrono::Local>::from(time);
                            out.push(format!(
                                "Last Modified: {}",
                                stamp.format("%Y-%m-%d %H:%M:%S")
                            ));
                        }
                        Err(_) => out.push("Last Modified: Unknown".to_string()),
                    }
                }
                Err(err) => out.push(format!("Error reading file info: {}", err)),
            }

            match fs::read_to_string(&self.path) {
                Ok(content) => {
                    out.push(format!("Total Lines: {}", content.lines().count()));
                    out.push(format!(
                        "First Line: {}",
                        content.lines().next().unwrap_or("Empty")
                    ));
                }
                Err(err) => out.push(format!("Error reading file content: {}", err)),
            }
        }

        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_appends_timestamped_line() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new(dir.path().join("app.log"));
        logger.info("hello");

        let content = fs::read_to_string(logger.path()).unwrap();
        let line = content.lines().next().unwrap();
        // "YYYY-MM-DD HH:MM:SS: hello"
        assert!(line.ends_with(": hello"), "line was: {}", line);
        assert_eq!(&line[4..5], "-");
        assert_eq!(&line[7..8], "-");
        assert_eq!(&line[10..11], " ");
    }

    #[test]
    fn clear_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new(dir.path().join("app.log"));
        logger.clear();
        assert!(logger.path().exists());
        assert_eq!(fs::read_to_string(logger.path()).unwrap(), "");
    }

    #[test]
    fn lazily_creates_parent_directory_on_first_write() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::new(dir.path().join("nested/deeper/app.log"));
        logger.info("first");
        assert!(logger.path().exists());
    }
}
