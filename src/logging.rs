//! Tracing setup for the binary: a plain-text log file plus a stderr console.
//!
//! The file keeps `info` and up for this crate so every decision of a run
//! (folders created, renames, failures) is on record. The console only
//! shows warnings unless `--verbose` is given. `RUST_LOG` overrides both.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FILE_FILTER: &str = "declutter=info";
const CONSOLE_FILTER: &str = "warn";
const VERBOSE_CONSOLE_FILTER: &str = "declutter=debug,info";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log file; `None` logs to the console only.
    pub file: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to prepare log file {}: {source}", path.display())]
    File { path: PathBuf, source: io::Error },
    #[error("a global logger is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Keeps the background log writer alive. Dropping it flushes the file.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// `<local data dir>/declutter/declutter.log`.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("declutter").join("declutter.log"))
        .unwrap_or_else(|| PathBuf::from("declutter.log"))
}

/// Installs the global subscriber.
pub fn init(options: &LogOptions) -> Result<LogGuard, LogError> {
    let mut worker = None;

    let file_layer = match &options.file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            worker = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(env_filter(FILE_FILTER)),
            )
        }
        None => None,
    };

    let console_default = if options.verbose {
        VERBOSE_CONSOLE_FILTER
    } else {
        CONSOLE_FILTER
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(env_filter(console_default));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LogError::AlreadyInstalled(e.to_string()))?;

    Ok(LogGuard { _worker: worker })
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Creates the log directory and splits the path for the appender.
fn split_log_path(path: &Path) -> Result<(PathBuf, std::ffi::OsString), LogError> {
    let file_error = |source| LogError::File {
        path: path.to_path_buf(),
        source,
    };

    let name = path.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
        file_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log path has no file name",
        ))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(file_error)?;
    Ok((dir, name))
}
