//! Tracing initialization.
//!
//! Diagnostics go to stderr so stdout stays reserved for progress lines and
//! summaries. An optional log file gets the same events through a
//! non-blocking writer, which matters for long-running schedules.
//!
//! The level comes from [`LogLevel`] only; `RUST_LOG` is not consulted.

use crate::config::LogLevel;
use chrono::Local;
use std::fmt as stdfmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {}: {source}", .path.display())]
    OpenLogFile { path: PathBuf, source: io::Error },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Local wall-clock timestamps (YYYY-MM-DD HH:MM:SS).
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

#[inline]
pub fn to_level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Verbose => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

fn open_log_file(path: &Path) -> Result<fs::File, LoggingError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| LoggingError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Installs the global subscriber.
///
/// Returns the file writer's guard when `log_file` is given; it must be held
/// until exit so buffered lines are flushed.
pub fn init_tracing(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::new(to_level_filter(level).to_string());

    let stderr_layer = tsfmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalHumanTime)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = tsfmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalHumanTime)
                .with_target(false)
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_mapping() {
        assert_eq!(to_level_filter(LogLevel::Quiet), LevelFilter::ERROR);
        assert_eq!(to_level_filter(LogLevel::Normal), LevelFilter::INFO);
        assert_eq!(to_level_filter(LogLevel::Verbose), LevelFilter::DEBUG);
        assert_eq!(to_level_filter(LogLevel::Debug), LevelFilter::TRACE);
    }

    #[test]
    fn test_log_file_parent_is_created() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("logs/nested/dirsweep.log");

        open_log_file(&path).expect("open failed");
        assert!(path.exists());
    }

    #[test]
    fn test_log_file_under_a_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "x").expect("Failed to write");

        let result = open_log_file(&blocker.join("dirsweep.log"));
        assert!(matches!(result, Err(LoggingError::OpenLogFile { .. })));
    }
}
