//! New-alert detection and notification fan-out.
//!
//! The decision ([`plan_notifications`]) is pure. [`NotificationDispatcher`]
//! delivers a plan to the sink and then replaces the instance's fingerprint
//! set, whether or not delivery succeeded. The sink is then told which ids are
//! still live so it can drop state kept for resolved alerts.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use amwatch_core::ports::NotificationSink;
use amwatch_core::types::{Alert, Notification, NotificationPriority, Severity};

use crate::fingerprint::{FingerprintTracker, TrackedFingerprints, current_fingerprints};

/// Maximum number of individual notifications per cycle.
pub const NOTIFICATION_CAP: usize = 5;

/// Prefix of per-alert notification ids.
pub const ALERT_NOTIFICATION_PREFIX: &str = "alert-";

/// Id of the batch-summary notification.
pub const BATCH_NOTIFICATION_ID: &str = "alert-batch";

/// Message used when an alert has no summary annotation.
pub const FALLBACK_MESSAGE: &str = "No summary available";

/// A notification together with the id it is created under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub id: String,
    pub notification: Notification,
}

/// What a cycle should notify about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPlan {
    /// Active alerts whose fingerprint was not in the stored set
    pub new_alert_count: usize,

    /// No cycle had completed for the instance; nothing is sent
    pub cold_start: bool,

    /// Up to [`NOTIFICATION_CAP`] per-alert notifications, in fetch order
    pub individual: Vec<PlannedNotification>,

    /// Summary sent when more than [`NOTIFICATION_CAP`] alerts are new
    pub batch: Option<PlannedNotification>,
}

impl NotificationPlan {
    /// All notifications in delivery order.
    pub fn notifications(&self) -> impl Iterator<Item = &PlannedNotification> {
        self.individual.iter().chain(self.batch.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.batch.is_none()
    }
}

/// Outcome of one notification stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub cold_start: bool,
    pub new_alerts: usize,
    pub delivered: usize,
    pub failed: usize,
    pub batched: bool,
    pub tracked_fingerprints: usize,
}

/// Active alerts absent from the stored set, in fetch order.
pub fn new_alerts<'a>(alerts: &'a [Alert], tracked: &TrackedFingerprints) -> Vec<&'a Alert> {
    let known = tracked.as_set();
    alerts
        .iter()
        .filter(|a| a.is_active() && !known.contains(a.fingerprint.as_str()))
        .collect()
}

/// Decide which notifications a cycle sends.
pub fn plan_notifications(alerts: &[Alert], tracked: &TrackedFingerprints) -> NotificationPlan {
    let fresh = new_alerts(alerts, tracked);
    let new_alert_count = fresh.len();

    if tracked.is_cold() {
        return NotificationPlan {
            new_alert_count,
            cold_start: true,
            ..Default::default()
        };
    }

    let individual = fresh
        .iter()
        .take(NOTIFICATION_CAP)
        .map(|alert| PlannedNotification {
            id: alert_notification_id(alert),
            notification: alert_notification(alert),
        })
        .collect();

    let batch = (new_alert_count > NOTIFICATION_CAP).then(|| PlannedNotification {
        id: BATCH_NOTIFICATION_ID.to_string(),
        notification: batch_notification(new_alert_count),
    });

    NotificationPlan {
        new_alert_count,
        cold_start: false,
        individual,
        batch,
    }
}

/// Notification id for an alert.
pub fn alert_notification_id(alert: &Alert) -> String {
    format!("{ALERT_NOTIFICATION_PREFIX}{}", alert.fingerprint)
}

/// Notification for a single new alert.
pub fn alert_notification(alert: &Alert) -> Notification {
    let (title, priority) = match alert.severity() {
        Severity::Critical => (
            format!("🔥 Critical: {}", alert.name()),
            NotificationPriority::High,
        ),
        _ => (format!("Alert: {}", alert.name()), NotificationPriority::Default),
    };

    Notification {
        title,
        message: alert.summary().unwrap_or(FALLBACK_MESSAGE).to_string(),
        priority,
    }
}

/// Summary notification stating the total number of new alerts.
pub fn batch_notification(total: usize) -> Notification {
    Notification {
        title: "Multiple new alerts".to_string(),
        message: format!("{total} new alerts are firing"),
        priority: NotificationPriority::Default,
    }
}

/// Delivers plans to a sink and owns the fingerprint update.
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    tracker: Arc<FingerprintTracker>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, tracker: Arc<FingerprintTracker>) -> Self {
        Self { sink, tracker }
    }

    /// Run the notification stage for one instance.
    ///
    /// Delivery failures are logged per notification. The fingerprint set is
    /// replaced exactly once, after delivery, regardless of the outcome.
    pub async fn process(&self, instance_id: &str, alerts: &[Alert]) -> DispatchReport {
        let tracked = self.tracker.snapshot(instance_id);
        let plan = plan_notifications(alerts, &tracked);

        if plan.cold_start && plan.new_alert_count > 0 {
            info!(
                instance = instance_id,
                suppressed = plan.new_alert_count,
                "First poll for instance, suppressing notifications"
            );
        }

        let mut delivered = 0;
        let mut failed = 0;
        for planned in plan.notifications() {
            match self.sink.create(&planned.id, &planned.notification).await {
                Ok(()) => {
                    debug!(instance = instance_id, id = %planned.id, "Notification sent");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        instance = instance_id,
                        id = %planned.id,
                        error = %e,
                        "Notification dispatch failed"
                    );
                    failed += 1;
                }
            }
        }

        let fingerprints = current_fingerprints(alerts);
        let tracked_fingerprints = fingerprints.len();
        let mut live: HashSet<String> = fingerprints
            .iter()
            .map(|fp| format!("{ALERT_NOTIFICATION_PREFIX}{fp}"))
            .collect();
        if let Some(batch) = &plan.batch {
            live.insert(batch.id.clone());
        }
        self.tracker.replace(instance_id, fingerprints);
        self.sink.retain(&live);

        DispatchReport {
            cold_start: plan.cold_start,
            new_alerts: plan.new_alert_count,
            delivered,
            failed,
            batched: plan.batch.is_some(),
            tracked_fingerprints,
        }
    }
}
