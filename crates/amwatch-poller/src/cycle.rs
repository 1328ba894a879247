//! One poll of the active instance.
//!
//! Stages run strictly in sequence and each one handles its own failure:
//!
//! 1. resolve the active instance (none: hide the badge and stop)
//! 2. load settings (failure ends the cycle)
//! 3. fetch alerts and cache them (failure: degraded badge, cycle ends)
//! 4. update the badge
//! 5. notify about new alerts, if enabled
//! 6. fetch and cache silences
//!
//! Stages 4 to 6 only log their failures. Nothing escapes [`PollCycle::run_cycle`]
//! as an error; the caller gets a [`CycleOutcome`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::log_stage_failure;
use amwatch_core::ports::{
    AlertCache, BadgeSink, MonitoringApi, NotificationSink, SettingsProvider,
};
use amwatch_core::types::{
    Alert, AlertFilter, BadgeState, CachePayload, MonitoringInstance, SilenceFilter,
};

use crate::badge::compute_badge;
use crate::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::fingerprint::FingerprintTracker;
use crate::scheduler::TickHandler;

/// Capabilities a poll cycle is wired with.
#[derive(Clone)]
pub struct PollPorts {
    pub settings: Arc<dyn SettingsProvider>,
    pub api: Arc<dyn MonitoringApi>,
    pub cache: Arc<dyn AlertCache>,
    pub badge: Arc<dyn BadgeSink>,
    pub notifications: Arc<dyn NotificationSink>,
}

/// Summary of a cycle that got past the alert fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub instance_id: String,

    /// Alerts returned by the fetch, any state
    pub alert_count: usize,

    /// Alerts in the `active` state
    pub active_count: usize,

    /// Badge computed for this cycle
    pub badge: BadgeState,

    /// `None` when notifications are disabled
    pub notifications: Option<DispatchReport>,

    /// Number of silences cached; `None` if the silence fetch failed
    pub silences: Option<usize>,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No active instance; badge hidden
    Idle,

    /// Another cycle for the same instance was still running
    Skipped { instance_id: String },

    /// The settings store could not be read
    SettingsUnavailable { reason: String },

    /// Alert fetch failed; degraded badge shown
    Degraded { instance_id: String, reason: String },

    Completed(CycleReport),
}

impl CycleOutcome {
    /// Short label for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Skipped { .. } => "skipped",
            Self::SettingsUnavailable { .. } => "settings_unavailable",
            Self::Degraded { .. } => "degraded",
            Self::Completed(_) => "completed",
        }
    }
}

/// The poll orchestrator.
pub struct PollCycle {
    settings: Arc<dyn SettingsProvider>,
    api: Arc<dyn MonitoringApi>,
    cache: Arc<dyn AlertCache>,
    badge: Arc<dyn BadgeSink>,
    tracker: Arc<FingerprintTracker>,
    dispatcher: NotificationDispatcher,
    in_flight: Mutex<HashSet<String>>,
}

impl PollCycle {
    pub fn new(ports: PollPorts) -> Self {
        Self::with_tracker(ports, Arc::new(FingerprintTracker::new()))
    }

    /// Build a cycle sharing an existing fingerprint tracker.
    pub fn with_tracker(ports: PollPorts, tracker: Arc<FingerprintTracker>) -> Self {
        Self {
            dispatcher: NotificationDispatcher::new(ports.notifications, tracker.clone()),
            settings: ports.settings,
            api: ports.api,
            cache: ports.cache,
            badge: ports.badge,
            tracker,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<FingerprintTracker> {
        &self.tracker
    }

    /// Drop all state held for an instance: fingerprints and cache entries.
    pub fn forget_instance(&self, instance_id: &str) {
        self.tracker.reset(instance_id);
        if let Err(e) = self.cache.forget(instance_id) {
            log_stage_failure!(instance_id, "forget", e);
        }
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        // Stage 1: resolve target
        let instance = match self.settings.active_instance().await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                debug!("No active instance, clearing badge");
                self.apply_badge("-", &BadgeState::hidden()).await;
                return CycleOutcome::Idle;
            }
            Err(e) => {
                error!(stage = "resolve", error = %e, "Could not read active instance");
                return CycleOutcome::SettingsUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &instance.id) else {
            debug!(instance = %instance.id, "Cycle already running, skipping");
            return CycleOutcome::Skipped {
                instance_id: instance.id,
            };
        };

        // Stage 2: load settings
        let settings = match self.settings.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                error!(
                    instance = %instance.id,
                    stage = "settings",
                    error = %e,
                    "Could not load settings"
                );
                return CycleOutcome::SettingsUnavailable {
                    reason: e.to_string(),
                };
            }
        };
        let timeout = settings.request_timeout();

        // Stage 3: fetch alerts
        let alerts = match self.fetch_alerts(&instance, &settings.default_filter, timeout).await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(
                    instance = %instance.id,
                    stage = "alerts",
                    error = %e,
                    "Alert fetch failed, badge degraded"
                );
                self.apply_badge(&instance.id, &BadgeState::degraded()).await;
                return CycleOutcome::Degraded {
                    instance_id: instance.id,
                    reason: e.to_string(),
                };
            }
        };
        if let Err(e) = self
            .cache
            .put(&instance.id, CachePayload::Alerts(alerts.clone()))
        {
            log_stage_failure!(instance.id.as_str(), "cache_alerts", e);
        }

        // Stage 4: badge
        let badge = compute_badge(&alerts, settings.badge_enabled);
        self.apply_badge(&instance.id, &badge).await;

        // Stage 5: notifications
        let notifications = if settings.notifications_enabled {
            Some(self.dispatcher.process(&instance.id, &alerts).await)
        } else {
            None
        };

        // Stage 6: silences
        let silences = self.refresh_silences(&instance, timeout).await;

        let report = CycleReport {
            instance_id: instance.id.clone(),
            alert_count: alerts.len(),
            active_count: alerts.iter().filter(|a| a.is_active()).count(),
            badge,
            notifications,
            silences,
        };
        info!(
            instance = %report.instance_id,
            alerts = report.alert_count,
            active = report.active_count,
            "Poll cycle completed"
        );
        CycleOutcome::Completed(report)
    }

    async fn fetch_alerts(
        &self,
        instance: &MonitoringInstance,
        filter: &AlertFilter,
        timeout: Duration,
    ) -> Result<Vec<Alert>> {
        tokio::time::timeout(timeout, self.api.fetch_alerts(instance, filter))
            .await
            .map_err(|_| timed_out(instance, timeout))?
    }

    async fn refresh_silences(
        &self,
        instance: &MonitoringInstance,
        timeout: Duration,
    ) -> Option<usize> {
        let fetched = tokio::time::timeout(
            timeout,
            self.api.fetch_silences(instance, &SilenceFilter::default()),
        )
        .await
        .map_err(|_| timed_out(instance, timeout))
        .and_then(|result| result);

        match fetched {
            Ok(silences) => {
                let count = silences.len();
                if let Err(e) = self.cache.put(&instance.id, CachePayload::Silences(silences)) {
                    log_stage_failure!(instance.id.as_str(), "cache_silences", e);
                }
                Some(count)
            }
            Err(e) => {
                log_stage_failure!(instance.id.as_str(), "silences", e);
                None
            }
        }
    }

    async fn apply_badge(&self, instance_id: &str, state: &BadgeState) {
        if let Err(e) = self.badge.apply(state).await {
            log_stage_failure!(instance_id, "badge", e);
        }
    }
}

#[async_trait]
impl TickHandler for PollCycle {
    async fn on_tick(&self) {
        let outcome = self.run_cycle().await;
        debug!(outcome = outcome.label(), "Scheduled poll finished");
    }
}

fn timed_out(instance: &MonitoringInstance, timeout: Duration) -> AmwatchError {
    AmwatchError::FetchTimeout {
        url: instance.base_url().to_string(),
        timeout_secs: timeout.as_secs(),
    }
}

/// Marks an instance as being polled until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    instance_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, instance_id: &str) -> Option<Self> {
        lock(set).insert(instance_id.to_string()).then(|| Self {
            set,
            instance_id: instance_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.instance_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_is_exclusive_per_instance() {
        let set = Mutex::new(HashSet::new());
        let first = InFlightGuard::acquire(&set, "prod");
        assert!(first.is_some());
        assert!(InFlightGuard::acquire(&set, "prod").is_none());
        assert!(InFlightGuard::acquire(&set, "staging").is_some());

        drop(first);
        assert!(InFlightGuard::acquire(&set, "prod").is_some());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CycleOutcome::Idle.label(), "idle");
        assert_eq!(
            CycleOutcome::Degraded {
                instance_id: "prod".into(),
                reason: "timeout".into()
            }
            .label(),
            "degraded"
        );
    }

    #[test]
    fn test_timeout_error_carries_instance_url() {
        let instance = MonitoringInstance::new("prod", "http://am.example:9093/");
        let err = timed_out(&instance, Duration::from_secs(10));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("http://am.example:9093"));
    }
}
