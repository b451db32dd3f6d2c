//! Console plus rotating-file logging for the client.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Verbosity;
use crate::error::NseFetchError;

/// Prefix of the log files written under the log directory.
pub const LOG_FILE_PREFIX: &str = "NseFetch";

/// Rotated files kept before the oldest is removed.
pub const MAX_LOG_FILES: usize = 25;

/// Installs the global subscriber: an env filter (`RUST_LOG` wins over
/// `verbosity`), a console layer and a daily-rotated file under `log_dir`.
///
/// Returns `None` without touching anything when `verbosity` is quiet or a
/// global subscriber is already in place. The returned guard flushes the
/// file writer on drop and must be kept alive.
pub fn init(verbosity: Verbosity, log_dir: &Path) -> Result<Option<WorkerGuard>, NseFetchError> {
    if verbosity == Verbosity::Quiet || tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    std::fs::create_dir_all(log_dir)?;
    let file_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| {
            NseFetchError::InvalidInput(format!(
                "cannot open log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let console_layer = fmt::layer().with_target(true).with_thread_names(true);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_line_number(true)
        .with_writer(writer);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => {
            tracing::info!("Logging to {} with level {}", log_dir.display(), verbosity);
            Ok(Some(guard))
        }
        Err(_) => Ok(None),
    }
}
