//! Config hot-reload.
//!
//! Watches the directory containing `config.yaml` (editors often replace the
//! file rather than writing in place) and emits a [`ConfigEvent`] whenever the
//! file changes. Invalid edits produce a `ValidationError` and the previous
//! configuration stays in effect.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use amwatch_core::error::{AmwatchError, Result};

use crate::file::AppConfig;

/// Default debounce duration for config changes (50ms).
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Channel buffer for config events.
pub const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Configuration events emitted when the file changes.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// File changed and parsed cleanly.
    Reloaded {
        /// New configuration values
        config: Box<AppConfig>,
    },
    /// File changed but could not be parsed or validated.
    ValidationError {
        /// Error message describing what's wrong
        error: String,
        /// Path to the config file
        path: PathBuf,
    },
    /// File was deleted.
    Removed,
}

/// Debounced watcher for `config.yaml`.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `path` with the default debounce.
    pub fn new(path: impl Into<PathBuf>) -> Result<(Self, mpsc::Receiver<ConfigEvent>)> {
        Self::with_debounce(path, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    /// Start watching `path` with a custom debounce duration.
    pub fn with_debounce(
        path: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<ConfigEvent>)> {
        let path = path.into();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| AmwatchError::DirectoryCreation {
                path: dir.clone(),
                source: e,
            })?;
        }

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let watched = path.clone();

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        !matches!(event.event.kind, EventKind::Access(_))
                            && event.event.paths.iter().any(|p| same_file(p, &watched))
                    });
                    if touched {
                        let event = read_event(&watched);
                        if tx.blocking_send(event).is_err() {
                            debug!("Config event receiver dropped");
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("Config watcher error: {:?}", error);
                    }
                }
            }
        })
        .map_err(|e| AmwatchError::WatcherInit {
            message: format!("Failed to create debouncer: {e}"),
        })?;

        debouncer
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| AmwatchError::WatcherInit {
                message: format!("Failed to watch directory {}: {e}", dir.display()),
            })?;

        info!(path = %path.display(), "Watching config file");

        Ok((
            Self {
                _debouncer: debouncer,
                path,
            },
            rx,
        ))
    }

    /// Path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn same_file(candidate: &Path, watched: &Path) -> bool {
    candidate == watched || candidate.file_name() == watched.file_name()
}

/// Build the event describing the current state of the file.
fn read_event(path: &Path) -> ConfigEvent {
    if !path.exists() {
        warn!(path = %path.display(), "Config file removed");
        return ConfigEvent::Removed;
    }

    match AppConfig::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "Config reloaded");
            ConfigEvent::Reloaded {
                config: Box::new(config),
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Config reload rejected");
            ConfigEvent::ValidationError {
                error: e.to_string(),
                path: path.to_path_buf(),
            }
        }
    }
}
