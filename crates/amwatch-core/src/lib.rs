//! # amwatch-core
//!
//! Core types, errors and ports for amwatch.
//!
//! This crate provides:
//! - [`AmwatchError`] - Error type shared by every amwatch crate
//! - [`logging`] - Tracing setup
//! - [`types`] - Alerts, silences, instances, settings, badge and cache types
//! - [`ports`] - Traits the poller is wired with (settings, API, badge,
//!   notifications, cache)

pub mod error;
pub mod logging;
pub mod ports;
pub mod types;

pub use error::{AmwatchError, Result};
pub use logging::{LogGuard, init_logging};
pub use ports::{AlertCache, BadgeSink, MonitoringApi, NotificationSink, SettingsProvider};
pub use types::{
    Alert, AlertFilter, AlertState, AlertStatus, AuthConfig, BadgeColor, BadgeState, CacheEntry,
    CacheKind, CachePayload, Matcher, MonitorStatus, MonitoringInstance, Notification,
    NotificationPriority, Settings, Severity, Silence, SilenceFilter, SilenceState,
    SilenceStatus,
};
