//! Console and rolling JSON file output
//!
//! The console layer is always installed. With `logging.local_enabled` a
//! second layer writes one JSON object per event to
//! `<local_path>/bibexport.<date>.jsonl` through a non-blocking writer, keeping
//! at most `local_max_files` rotated files.
//!
//! ```no_run
//! use bibexport::logging::init_logging;
//! use bibexport::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{BibExportError, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "bibexport";
const LOG_FILE_SUFFIX: &str = "jsonl";

/// Flushes buffered file output when dropped
///
/// Keep it alive until the process exits.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize console logging and, when enabled, the JSON file layer
///
/// `RUST_LOG` takes precedence over `level` when set. Without it only
/// `bibexport` events at `level` or above are shown.
///
/// # Errors
///
/// Returns [`BibExportError::Configuration`] for an unknown level or rotation,
/// a log directory that cannot be created, or a second initialization.
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(level)?;
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("bibexport={level}")))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_names(true)
        .with_filter(filter())
        .boxed();

    let (file, file_guard) = if config.local_enabled {
        let (writer, guard) = file_writer(config)?;
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_thread_ids(true)
            .with_writer(writer)
            .with_filter(filter())
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| BibExportError::Configuration(format!("Logging already initialized: {e}")))?;

    tracing::debug!(
        level = %level,
        file_logging = config.local_enabled,
        local_path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn file_writer(config: &LoggingConfig) -> Result<(NonBlocking, WorkerGuard)> {
    let rotation = parse_rotation(&config.local_rotation)?;
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        BibExportError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.local_max_files)
        .build(&config.local_path)
        .map_err(|e| BibExportError::Configuration(format!("Failed to open log file: {e}")))?;

    Ok(tracing_appender::non_blocking(appender))
}

fn parse_log_level(level: &str) -> Result<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        BibExportError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

fn parse_rotation(rotation: &str) -> Result<Rotation> {
    match rotation.to_lowercase().as_str() {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        _ => Err(BibExportError::Configuration(format!(
            "Invalid log rotation: {rotation}. Must be 'daily' or 'hourly'"
        ))),
    }
}
