//! Capability traits the poller is wired with.
//!
//! The poll cycle never reaches for a global runtime: the settings store, the
//! monitoring API, the badge, the notification sink and the cache are all
//! injected as trait objects so each can be swapped for a fake in tests.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Alert, AlertFilter, BadgeColor, BadgeState, CacheEntry, CacheKind, CachePayload,
    MonitorStatus, MonitoringInstance, Notification, Settings, Silence, SilenceFilter,
};

/// Read access to the externally edited settings store.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// The instance currently selected for polling, if any.
    async fn active_instance(&self) -> Result<Option<MonitoringInstance>>;

    /// Current user preferences.
    async fn settings(&self) -> Result<Settings>;
}

/// Client for a monitoring backend.
///
/// Implementations own transport details: URL building, auth headers and the
/// per-request timeout.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    async fn fetch_alerts(
        &self,
        instance: &MonitoringInstance,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>>;

    async fn fetch_silences(
        &self,
        instance: &MonitoringInstance,
        filter: &SilenceFilter,
    ) -> Result<Vec<Silence>>;

    async fn fetch_status(&self, instance: &MonitoringInstance) -> Result<MonitorStatus>;
}

/// Where the badge is displayed.
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<()>;

    async fn set_color(&self, color: Option<BadgeColor>) -> Result<()>;

    /// Apply a full badge state.
    async fn apply(&self, state: &BadgeState) -> Result<()> {
        self.set_text(&state.text).await?;
        self.set_color(state.color).await
    }
}

/// Where notifications are delivered.
///
/// A second `create` with the same id is expected to replace the first.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, id: &str, notification: &Notification) -> Result<()>;

    /// Forget every notification whose id is not in `live_ids`.
    ///
    /// Called once per notification stage with the ids of the alerts still
    /// present. Sinks that keep per-id state prune it here.
    fn retain(&self, live_ids: &HashSet<String>) {
        let _ = live_ids;
    }
}

/// Last-good storage for alerts and silences, keyed by instance and kind.
pub trait AlertCache: Send + Sync {
    /// Store a payload with the current timestamp, replacing any prior entry.
    fn put(&self, instance_id: &str, payload: CachePayload) -> Result<()>;

    /// The stored entry, or `None` if nothing was ever written.
    fn get(&self, instance_id: &str, kind: CacheKind) -> Result<Option<CacheEntry>>;

    /// Drop every entry for an instance.
    fn forget(&self, instance_id: &str) -> Result<()>;
}
