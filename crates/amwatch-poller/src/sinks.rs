//! Badge and notification adapters for a headless host.
//!
//! - [`LogBadge`] and [`LogNotifier`] only log, and remember what they were given.
//! - [`FileBadge`] writes the badge as JSON for status bars to read.
//! - [`CommandNotifier`] shells out to a `notify-send` compatible command.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::{BadgeSink, NotificationSink};
use amwatch_core::types::{BadgeColor, BadgeState, Notification, NotificationPriority};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Badge sinks
// ============================================================================

/// Badge that logs every change.
#[derive(Debug, Default)]
pub struct LogBadge {
    state: Mutex<BadgeState>,
}

impl LogBadge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied state.
    pub fn current(&self) -> BadgeState {
        lock(&self.state).clone()
    }
}

#[async_trait]
impl BadgeSink for LogBadge {
    async fn set_text(&self, text: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.text != text {
            info!(text, "Badge text");
            state.text = text.to_string();
        }
        Ok(())
    }

    async fn set_color(&self, color: Option<BadgeColor>) -> Result<()> {
        let mut state = lock(&self.state);
        if state.color != color {
            info!(color = color.map(|c| c.hex()).unwrap_or("unset"), "Badge color");
            state.color = color;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct BadgeFile<'a> {
    text: &'a str,
    color: Option<BadgeColor>,
    hex: Option<&'static str>,
    updated_at: String,
}

/// Badge written to a JSON file, replaced atomically on every change.
///
/// Writes go through `tokio::fs`. The state lock is held across the write so
/// concurrent updates land on disk in the order they were made.
#[derive(Debug)]
pub struct FileBadge {
    path: PathBuf,
    state: tokio::sync::Mutex<BadgeState>,
}

impl FileBadge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: tokio::sync::Mutex::new(BadgeState::hidden()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, state: &BadgeState) -> Result<()> {
        let body = serde_json::to_string_pretty(&BadgeFile {
            text: &state.text,
            color: state.color,
            hex: state.color.map(|c| c.hex()),
            updated_at: Utc::now().to_rfc3339(),
        })
        .map_err(|e| AmwatchError::badge(format!("encoding badge: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AmwatchError::badge(format!("{}: {e}", parent.display())))?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AmwatchError::badge(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AmwatchError::badge(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), text = %state.text, "Badge file written");
        Ok(())
    }
}

#[async_trait]
impl BadgeSink for FileBadge {
    async fn set_text(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.text = text.to_string();
        self.write(&state).await
    }

    async fn set_color(&self, color: Option<BadgeColor>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.color = color;
        self.write(&state).await
    }

    async fn apply(&self, next: &BadgeState) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = next.clone();
        self.write(&state).await
    }
}

// ============================================================================
// Notification sinks
// ============================================================================

/// Notifier that logs instead of displaying anything.
#[derive(Debug, Default)]
pub struct LogNotifier {
    shown: Mutex<HashMap<String, Notification>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notification currently shown under `id`.
    pub fn get(&self, id: &str) -> Option<Notification> {
        lock(&self.shown).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.shown).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn create(&self, id: &str, notification: &Notification) -> Result<()> {
        info!(
            id,
            title = %notification.title,
            priority = ?notification.priority,
            "{}",
            notification.message
        );
        lock(&self.shown).insert(id.to_string(), notification.clone());
        Ok(())
    }

    fn retain(&self, live_ids: &HashSet<String>) {
        lock(&self.shown).retain(|id, _| live_ids.contains(id));
    }
}

/// Desktop notifications through an external command.
///
/// Invoked as `<program> --urgency <critical|normal> --app-name amwatch <title> <body>`.
/// A repeat of the notification last shown under the same id is not re-sent.
/// Ids dropped by [`NotificationSink::retain`] are forgotten, so a later alert
/// reusing one is shown again.
#[derive(Debug)]
pub struct CommandNotifier {
    program: String,
    shown: Mutex<HashMap<String, Notification>>,
    invocations: AtomicUsize,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            shown: Mutex::new(HashMap::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of times the command was launched.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    fn urgency(priority: NotificationPriority) -> &'static str {
        match priority {
            NotificationPriority::High => "critical",
            NotificationPriority::Default => "normal",
        }
    }
}

#[async_trait]
impl NotificationSink for CommandNotifier {
    async fn create(&self, id: &str, notification: &Notification) -> Result<()> {
        if lock(&self.shown).get(id) == Some(notification) {
            debug!(id, "Notification unchanged, not re-sent");
            return Ok(());
        }

        self.invocations.fetch_add(1, Ordering::Relaxed);
        let output = Command::new(&self.program)
            .args([
                "--urgency",
                Self::urgency(notification.priority),
                "--app-name",
                "amwatch",
                notification.title.as_str(),
                notification.message.as_str(),
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AmwatchError::notification(id, format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AmwatchError::notification(
                id,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        lock(&self.shown).insert(id.to_string(), notification.clone());
        Ok(())
    }

    fn retain(&self, live_ids: &HashSet<String>) {
        let mut shown = lock(&self.shown);
        let before = shown.len();
        shown.retain(|id, _| live_ids.contains(id));
        if shown.len() < before {
            debug!(dropped = before - shown.len(), "Forgot resolved notifications");
        }
    }
}
