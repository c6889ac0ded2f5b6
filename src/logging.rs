//! Tracing setup shared by the `vetcardio` binaries.
//!
//! Human-readable events go to stderr so stdout stays free for JSON reports.
//! Every process also appends to its own file under the app logs directory,
//! named by launch time and pid so parallel CLI runs never share a file.
//! The file keeps thread ids and span timings, which is what lets concurrent
//! evaluations be told apart afterwards.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, fmt::format::FmtSpan, prelude::*};

use crate::app_dirs;

/// Log files from earlier launches kept on disk.
const RETAINED_LOG_FILES: usize = 10;
/// Used when `RUST_LOG` is unset; symphonia is chatty at info.
const DEFAULT_FILTER: &str = "info,symphonia=warn";
const LOG_FILE_PREFIX: &str = "vetcardio_";
const LOG_FILE_EXTENSION: &str = "log";

/// Keeps the non-blocking writer alive and remembers where it writes.
struct ActiveLog {
    path: PathBuf,
    _guard: WorkerGuard,
}

static ACTIVE_LOG: OnceLock<ActiveLog> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber and return this launch's log file.
///
/// Later calls return the same path without touching the subscriber.
pub fn init() -> Result<PathBuf, LoggingError> {
    if let Some(active) = ACTIVE_LOG.get() {
        return Ok(active.path.clone());
    }

    let log_dir = app_dirs::logs_dir().map_err(map_app_dir_error)?;
    let file_name = log_file_name(now_local_or_utc(), std::process::id())?;
    let log_path = log_dir.join(&file_name);
    create_log_file(&log_path)?;
    let removed = retain_recent_logs(&log_dir, &log_path, RETAINED_LOG_FILES)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));
    let timer = build_timer();
    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(timer)
        .with_writer(file_writer);
    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;

    let _ = ACTIVE_LOG.set(ActiveLog {
        path: log_path.clone(),
        _guard: guard,
    });
    tracing::debug!("Logging to {} ({removed} old log file(s) removed)", log_path.display());
    Ok(log_path)
}

fn create_log_file(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn is_vetcardio_log(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
    named && path.extension().and_then(|ext| ext.to_str()) == Some(LOG_FILE_EXTENSION)
}

/// Delete all but the `keep` most recently modified vetcardio logs, never
/// touching `current`. Files that cannot be removed are logged and skipped.
fn retain_recent_logs(dir: &Path, current: &Path, keep: usize) -> Result<usize, LoggingError> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_vetcardio_log(path) && path != current)
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    // Newest first; the current launch's file takes one slot.
    logs.sort_by(|a, b| b.0.cmp(&a.0));
    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(keep.saturating_sub(1)) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => tracing::warn!("Could not remove old log {}: {err}", path.display()),
        }
    }
    Ok(removed)
}

fn log_file_name(now: OffsetDateTime, pid: u32) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}_{pid}.{LOG_FILE_EXTENSION}"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoDataDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn log_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn file_name_carries_timestamp_and_pid() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = log_file_name(fixed, 4242).unwrap();
        assert_eq!(name, "vetcardio_2023-11-14_22-13-20_4242.log");
        assert!(is_vetcardio_log(Path::new(&name)));
    }

    #[test]
    fn retains_newest_logs_including_current() {
        let dir = tempdir().unwrap();
        for idx in 0..6 {
            create_log_file(&dir.path().join(format!("vetcardio_{idx}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        let current = dir.path().join("vetcardio_current.log");
        create_log_file(&current).unwrap();

        let removed = retain_recent_logs(dir.path(), &current, 3).unwrap();

        assert_eq!(removed, 4);
        assert_eq!(
            log_names(dir.path()),
            vec!["vetcardio_4.log", "vetcardio_5.log", "vetcardio_current.log"]
        );
    }

    #[test]
    fn leaves_foreign_files_alone() {
        let dir = tempdir().unwrap();
        for name in ["config.toml", "other_tool.log", "vetcardio_old.log"] {
            create_log_file(&dir.path().join(name)).unwrap();
        }
        let current = dir.path().join("vetcardio_now.log");
        create_log_file(&current).unwrap();

        let removed = retain_recent_logs(dir.path(), &current, 1).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            log_names(dir.path()),
            vec!["config.toml", "other_tool.log", "vetcardio_now.log"]
        );
    }
}
