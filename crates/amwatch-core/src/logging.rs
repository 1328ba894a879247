//! Logging infrastructure for amwatch.
//!
//! Structured logging using the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.amwatch/logs/amwatch.log` (rotated daily)
//! - Compact human-readable output on stderr
//! - `-v` raises the default level to DEBUG; `RUST_LOG` overrides both
//!
//! ## Example
//!
//! ```no_run
//! use amwatch_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("amwatch started");
//! tracing::debug!(instance = "prod", "polling");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{AmwatchError, Result};

/// Guard that must be held to ensure log flushing on shutdown.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the amwatch logging system.
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.amwatch/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// The returned [`LogGuard`] must be held for the application lifetime.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| AmwatchError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "amwatch.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("amwatch={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| AmwatchError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Base directory for amwatch state: `~/.amwatch/`.
pub fn amwatch_home() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| AmwatchError::internal("HOME environment variable not set"))?;

    Ok(PathBuf::from(home).join(".amwatch"))
}

/// Default log directory: `~/.amwatch/logs/`.
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(amwatch_home()?.join("logs"))
}

/// Log a poll-cycle stage failure that does not abort the cycle.
///
/// ```ignore
/// log_stage_failure!("prod", "silences", err);
/// ```
#[macro_export]
macro_rules! log_stage_failure {
    ($instance:expr, $stage:expr, $err:expr) => {
        tracing::warn!(
            target: "amwatch::cycle",
            instance = $instance,
            stage = $stage,
            error = %$err,
            "poll stage failed"
        )
    };
}
