//! Logging Setup
//!
//! Console logs go to stderr. When a log directory is configured a second
//! layer writes the same events to a daily rolling file through a
//! non-blocking worker.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::utils::error::{AppError, AppResult};

/// Environment variable naming the log directory.
pub const ENV_LOG_DIR: &str = "ARCH_INSIGHT_LOG_DIR";
/// Log files are named `arch-insight.<date>.log`.
pub const LOG_FILE_PREFIX: &str = "arch-insight";
/// Daily files kept before the oldest is removed.
pub const LOG_RETENTION_DAYS: usize = 7;

fn env_filter(verbose: bool) -> EnvFilter {
    let default_filter = if verbose {
        "arch_insight=debug,arch_insight_llm=debug"
    } else {
        "arch_insight=info,arch_insight_llm=warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Daily rolling appender under `dir`, created when missing.
pub fn rolling_appender(dir: &Path) -> AppResult<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(LOG_RETENTION_DAYS)
        .build(dir)
        .map_err(|e| {
            AppError::config(format!(
                "cannot open log directory {}: {}",
                dir.display(),
                e
            ))
        })
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive until the process exits.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> AppResult<Option<WorkerGuard>> {
    let mut guard = None;
    let file_layer = match log_dir {
        Some(dir) => {
            let (writer, worker) = tracing_appender::non_blocking(rolling_appender(dir)?);
            guard = Some(worker);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter(verbose)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(verbose)),
        )
        .try_init()
        .map_err(|e| AppError::config(format!("cannot install logger: {}", e)))?;

    Ok(guard)
}
