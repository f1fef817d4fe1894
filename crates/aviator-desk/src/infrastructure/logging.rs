//! Structured logging set-up.
//!
//! Two `tracing-subscriber` layers share one registry:
//!
//! - **console** – compact `fmt` output on stderr.  Level from `RUST_LOG`,
//!   default `warn` so command results stay readable.
//! - **file**    – `logs/sast_aviator_YYYYMMDD.log` at `debug`, with source
//!   file and line, no ANSI colours.
//!
//! The day's file is rotated on start-up once it grows past
//! [`MAX_LOG_BYTES`]: `x.log` becomes `x.log.1`, `x.log.1` becomes `x.log.2`
//! and so on, keeping [`LOG_BACKUPS`] backups.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Size at which the day's log file is rotated.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
/// Number of numbered backups kept.
pub const LOG_BACKUPS: usize = 5;

const DEFAULT_CONSOLE_FILTER: &str = "warn";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("I/O error preparing log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// `logs/sast_aviator_20240501.log`
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("sast_aviator_{}.log", date.format("%Y%m%d")))
}

/// Shifts `path` into numbered backups when it is at least `max_bytes` long.
///
/// Returns `true` when a rotation happened.
///
/// # Errors
///
/// Propagates rename/remove failures.
pub fn rotate_if_oversized(path: &Path, max_bytes: u64, backups: usize) -> std::io::Result<bool> {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size < max_bytes || backups == 0 {
        return Ok(false);
    }

    let oldest = backup_name(path, backups);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for index in (1..backups).rev() {
        let from = backup_name(path, index);
        if from.exists() {
            std::fs::rename(&from, backup_name(path, index + 1))?;
        }
    }
    std::fs::rename(path, backup_name(path, 1))?;
    Ok(true)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> LoggingError {
    let path = path.to_path_buf();
    move |source| LoggingError::Io { path, source }
}

fn backup_name(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Installs the console and file layers.  Returns the log file path.
///
/// # Errors
///
/// [`LoggingError::Io`] when the directory or file cannot be prepared,
/// [`LoggingError::AlreadyInstalled`] when called twice.
pub fn init(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(io_err(log_dir))?;
    let path = log_file_path(log_dir, chrono::Local::now().date_naive());
    rotate_if_oversized(&path, MAX_LOG_BYTES, LOG_BACKUPS).map_err(io_err(&path))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(io_err(&path))?;

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER)),
        );
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;
    Ok(path)
}
