//! In-memory fakes for every port the poll cycle is wired with.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::{BadgeSink, MonitoringApi, NotificationSink, SettingsProvider};
use amwatch_core::types::{
    Alert, AlertFilter, AlertState, AlertStatus, BadgeColor, BadgeState, MonitorStatus,
    MonitoringInstance, Notification, Settings, Silence, SilenceFilter, SilenceState,
    SilenceStatus,
};
use amwatch_poller::{MemoryCache, PollCycle, PollPorts};

pub const INSTANCE_ID: &str = "prod";

pub fn alert(fp: &str, severity: &str) -> Alert {
    alert_in_state(fp, severity, AlertState::Active)
}

pub fn alert_in_state(fp: &str, severity: &str, state: AlertState) -> Alert {
    let labels = HashMap::from([
        ("alertname".to_string(), format!("Alert{fp}")),
        ("severity".to_string(), severity.to_string()),
    ]);
    let annotations = HashMap::from([("summary".to_string(), format!("{fp} is firing"))]);
    Alert {
        fingerprint: fp.to_string(),
        labels,
        annotations,
        status: AlertStatus {
            state,
            silenced_by: vec![],
            inhibited_by: vec![],
        },
        starts_at: Utc::now(),
        ends_at: None,
        updated_at: None,
        generator_url: None,
    }
}

pub fn silence(id: &str) -> Silence {
    Silence {
        id: id.to_string(),
        matchers: vec![],
        status: SilenceStatus {
            state: SilenceState::Active,
        },
        starts_at: Utc::now(),
        ends_at: Utc::now() + chrono::Duration::hours(1),
        comment: "maintenance".to_string(),
        created_by: "ops".to_string(),
        updated_at: None,
    }
}

// ============================================================================
// Settings
// ============================================================================

pub struct FakeSettings {
    pub instance: Mutex<Option<MonitoringInstance>>,
    pub settings: Mutex<Settings>,
    pub fail_instance: AtomicBool,
    pub fail_settings: AtomicBool,
}

impl FakeSettings {
    pub fn with_instance() -> Self {
        Self {
            instance: Mutex::new(Some(MonitoringInstance::new(
                INSTANCE_ID,
                "http://alertmanager.test:9093",
            ))),
            settings: Mutex::new(Settings::default()),
            fail_instance: AtomicBool::new(false),
            fail_settings: AtomicBool::new(false),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.lock().unwrap());
    }
}

#[async_trait]
impl SettingsProvider for FakeSettings {
    async fn active_instance(&self) -> Result<Option<MonitoringInstance>> {
        if self.fail_instance.load(Ordering::SeqCst) {
            return Err(AmwatchError::settings_unavailable("store locked"));
        }
        Ok(self.instance.lock().unwrap().clone())
    }

    async fn settings(&self) -> Result<Settings> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(AmwatchError::settings_unavailable("store corrupted"));
        }
        Ok(self.settings.lock().unwrap().clone())
    }
}

// ============================================================================
// Monitoring API
// ============================================================================

/// Scripted API. `None` in `alerts` or `silences` makes that fetch fail.
pub struct FakeApi {
    pub alerts: Mutex<Option<Vec<Alert>>>,
    pub silences: Mutex<Option<Vec<Silence>>>,
    pub delay: Mutex<Option<Duration>>,
    pub alert_calls: AtomicUsize,
    pub last_filter: Mutex<Option<AlertFilter>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            alerts: Mutex::new(Some(vec![])),
            silences: Mutex::new(Some(vec![])),
            delay: Mutex::new(None),
            alert_calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
        }
    }
}

impl FakeApi {
    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.lock().unwrap() = Some(alerts);
    }

    pub fn fail_alerts(&self) {
        *self.alerts.lock().unwrap() = None;
    }

    pub fn set_silences(&self, silences: Vec<Silence>) {
        *self.silences.lock().unwrap() = Some(silences);
    }

    pub fn fail_silences(&self) {
        *self.silences.lock().unwrap() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl MonitoringApi for FakeApi {
    async fn fetch_alerts(
        &self,
        instance: &MonitoringInstance,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>> {
        self.alert_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let alerts = self.alerts.lock().unwrap().clone();
        alerts.ok_or_else(|| {
            AmwatchError::from_http_status(instance.base_url(), 503, "")
        })
    }

    async fn fetch_silences(
        &self,
        instance: &MonitoringInstance,
        _filter: &SilenceFilter,
    ) -> Result<Vec<Silence>> {
        let silences = self.silences.lock().unwrap().clone();
        silences.ok_or_else(|| AmwatchError::FetchTransport {
            url: instance.base_url().to_string(),
            message: "connection reset".to_string(),
        })
    }

    async fn fetch_status(&self, _instance: &MonitoringInstance) -> Result<MonitorStatus> {
        Ok(MonitorStatus {
            version: "0.27.0".to_string(),
            uptime: Utc::now(),
            cluster_status: "ready".to_string(),
            cluster_peers: 1,
        })
    }
}

// ============================================================================
// Badge
// ============================================================================

#[derive(Default)]
pub struct RecordingBadge {
    pub current: Mutex<BadgeState>,
    pub applied: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingBadge {
    pub fn current(&self) -> BadgeState {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl BadgeSink for RecordingBadge {
    async fn set_text(&self, text: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AmwatchError::badge("host rejected badge"));
        }
        self.current.lock().unwrap().text = text.to_string();
        Ok(())
    }

    async fn set_color(&self, color: Option<BadgeColor>) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AmwatchError::badge("host rejected badge"));
        }
        self.current.lock().unwrap().color = color;
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notification)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    /// Make every `create` take `delay` before it is recorded.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn ids(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn create(&self, id: &str, notification: &Notification) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((id.to_string(), notification.clone()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub settings: Arc<FakeSettings>,
    pub api: Arc<FakeApi>,
    pub cache: Arc<MemoryCache>,
    pub badge: Arc<RecordingBadge>,
    pub notifier: Arc<RecordingNotifier>,
    pub cycle: Arc<PollCycle>,
}

impl Harness {
    pub fn new() -> Self {
        let settings = Arc::new(FakeSettings::with_instance());
        let api = Arc::new(FakeApi::default());
        let cache = Arc::new(MemoryCache::new());
        let badge = Arc::new(RecordingBadge::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let cycle = Arc::new(PollCycle::new(PollPorts {
            settings: settings.clone(),
            api: api.clone(),
            cache: cache.clone(),
            badge: badge.clone(),
            notifications: notifier.clone(),
        }));

        Self {
            settings,
            api,
            cache,
            badge,
            notifier,
            cycle,
        }
    }

    pub fn tracked(&self) -> Vec<String> {
        self.cycle
            .tracker()
            .snapshot(INSTANCE_ID)
            .fingerprints()
            .to_vec()
    }
}
