//! Shared type definitions used across amwatch crates.
//!
//! The wire-facing types ([`Alert`], [`Silence`]) follow the Alertmanager v2
//! JSON shape (camelCase keys). Everything else is amwatch's own model.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Monitoring instances
// ============================================================================

/// A monitoring backend the user has configured.
///
/// Exactly one instance is active at a time (or none). Instances are owned by
/// the settings store; the poller only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringInstance {
    /// Stable identifier, used as the key for cache and fingerprint state
    pub id: String,

    /// Base URL of the Alertmanager (without `/api/v2`)
    pub url: String,

    /// Authentication passed through to the API client
    #[serde(default)]
    pub auth: AuthConfig,
}

impl MonitoringInstance {
    /// Create an instance without authentication.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            auth: AuthConfig::None,
        }
    }

    /// Set the authentication.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Base URL with any trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Credentials for a monitoring instance.
///
/// Credentials are opaque to amwatch: they are handed to the HTTP client and
/// never logged. `Debug` redacts them.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,
    /// HTTP basic authentication
    Basic { username: String, password: String },
    /// Bearer token
    Bearer { token: String },
}

impl AuthConfig {
    /// Short name of the auth scheme.
    pub fn auth_type(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// User preferences read by the poller at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How often the scheduler fires (floored by the scheduler)
    pub refresh_interval_secs: u64,

    /// Bounded wait for a single API request
    pub request_timeout_secs: u64,

    /// Whether the badge shows anything at all
    pub badge_enabled: bool,

    /// Whether new alerts raise notifications
    pub notifications_enabled: bool,

    /// Filter applied to every alert fetch
    pub default_filter: AlertFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            badge_enabled: true,
            notifications_enabled: true,
            default_filter: AlertFilter::default(),
        }
    }
}

impl Settings {
    /// Request timeout as a [`std::time::Duration`].
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Filter for alert queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertFilter {
    pub active: bool,
    pub silenced: bool,
    pub inhibited: bool,
    pub unprocessed: bool,

    /// Label matchers in Alertmanager syntax, e.g. `severity=~"critical|warning"`
    pub label_matchers: Vec<String>,

    /// Regex the receiver name must match
    pub receiver: Option<String>,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            active: true,
            silenced: false,
            inhibited: false,
            unprocessed: true,
            label_matchers: Vec::new(),
            receiver: None,
        }
    }
}

/// Filter for silence queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceFilter {
    #[serde(default)]
    pub label_matchers: Vec<String>,
}

// ============================================================================
// Alerts
// ============================================================================

/// Processing state of an alert as reported by Alertmanager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Active,
    Suppressed,
    Unprocessed,
}

/// Alert status block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    pub state: AlertState,
    #[serde(default)]
    pub silenced_by: Vec<String>,
    #[serde(default)]
    pub inhibited_by: Vec<String>,
}

/// A single alert.
///
/// `fingerprint` is the sole identity key. Two fetches may return the same
/// alert with different state or annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub fingerprint: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub status: AlertStatus,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "generatorURL", skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<String>,
}

impl Alert {
    /// Whether Alertmanager reports the alert as active (not silenced or inhibited).
    pub fn is_active(&self) -> bool {
        self.status.state == AlertState::Active
    }

    /// Severity from the `severity` label.
    pub fn severity(&self) -> Severity {
        self.labels
            .get("severity")
            .map(|s| Severity::from_label(s))
            .unwrap_or(Severity::Other)
    }

    /// The `alertname` label, or `"unknown"`.
    pub fn name(&self) -> &str {
        self.labels
            .get("alertname")
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// The `summary` annotation, falling back to `description`.
    pub fn summary(&self) -> Option<&str> {
        self.annotations
            .get("summary")
            .or_else(|| self.annotations.get("description"))
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Alert severity derived from the `severity` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Other = 0,
    Info = 1,
    Warning = 2,
    Critical = 3,
}

impl Severity {
    /// Parse a severity label value (case-insensitive).
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "warning" => Self::Warning,
            "info" => Self::Info,
            _ => Self::Other,
        }
    }
}

// ============================================================================
// Silences
// ============================================================================

/// A silence matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default = "default_true")]
    pub is_equal: bool,
}

fn default_true() -> bool {
    true
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match (self.is_equal, self.is_regex) {
            (true, false) => "=",
            (true, true) => "=~",
            (false, false) => "!=",
            (false, true) => "!~",
        };
        write!(f, "{}{}\"{}\"", self.name, op, self.value)
    }
}

/// Lifecycle state of a silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilenceState {
    Active,
    Pending,
    Expired,
}

/// Silence status block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceStatus {
    pub state: SilenceState,
}

/// A silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    pub id: String,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    pub status: SilenceStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Silence {
    /// Whether the silence currently mutes alerts.
    pub fn is_active(&self) -> bool {
        self.status.state == SilenceState::Active
    }

    /// Matchers rendered as `{a="b", c=~"d"}`.
    pub fn matchers_display(&self) -> String {
        let parts: Vec<String> = self.matchers.iter().map(ToString::to_string).collect();
        format!("{{{}}}", parts.join(", "))
    }
}

// ============================================================================
// Monitor status
// ============================================================================

/// Summary of `GET /api/v2/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub version: String,
    pub uptime: DateTime<Utc>,
    pub cluster_status: String,
    pub cluster_peers: usize,
}

// ============================================================================
// Badge
// ============================================================================

/// Badge colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeColor {
    Critical,
    Warning,
    Info,
    /// No active alerts
    Ok,
    /// Last fetch failed
    Degraded,
}

impl BadgeColor {
    /// Hex colour used by badge sinks.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Critical => "#d32f2f",
            Self::Warning => "#f57c00",
            Self::Info => "#1976d2",
            Self::Ok => "#388e3c",
            Self::Degraded => "#9e9e9e",
        }
    }
}

/// Text of the degraded indicator.
pub const DEGRADED_BADGE_TEXT: &str = "!";

/// Derived badge state. Recomputed every cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BadgeState {
    pub text: String,
    /// `None` means the colour is unset (badge hidden)
    pub color: Option<BadgeColor>,
}

impl BadgeState {
    /// Empty text, colour unset.
    pub fn hidden() -> Self {
        Self::default()
    }

    /// The "last fetch failed" indicator.
    pub fn degraded() -> Self {
        Self {
            text: DEGRADED_BADGE_TEXT.to_string(),
            color: Some(BadgeColor::Degraded),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.color == Some(BadgeColor::Degraded)
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Default,
    High,
}

/// A notification handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

// ============================================================================
// Cache
// ============================================================================

/// Kind of cached payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Alerts,
    Silences,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::Silences => "silences",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-good data for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CachePayload {
    Alerts(Vec<Alert>),
    Silences(Vec<Silence>),
}

impl CachePayload {
    pub fn kind(&self) -> CacheKind {
        match self {
            Self::Alerts(_) => CacheKind::Alerts,
            Self::Silences(_) => CacheKind::Silences,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Alerts(items) => items.len(),
            Self::Silences(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A cached payload with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: CachePayload,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}
