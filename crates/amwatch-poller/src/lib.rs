//! # amwatch-poller
//!
//! The background polling engine.
//!
//! - [`PollScheduler`] - single recurring timer driving the cycle
//! - [`PollCycle`] - resolve, fetch, cache, badge, notify, silences
//! - [`FingerprintTracker`] - per-instance fingerprints of the last cycle
//! - [`NotificationDispatcher`] - new-alert detection with batching
//! - [`compute_badge`] - badge text and colour from an alert list
//! - [`cache`] - last-good alerts and silences (memory or SQLite)
//! - [`sinks`] - badge and notification adapters

pub mod badge;
pub mod cache;
pub mod cycle;
pub mod dispatcher;
pub mod fingerprint;
pub mod scheduler;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub use badge::compute_badge;
pub use cache::{MemoryCache, SqliteCache};
pub use cycle::{CycleOutcome, CycleReport, PollCycle, PollPorts};
pub use dispatcher::{
    BATCH_NOTIFICATION_ID, DispatchReport, NOTIFICATION_CAP, NotificationDispatcher,
    NotificationPlan, plan_notifications,
};
pub use fingerprint::{FingerprintTracker, TrackedFingerprints};
pub use scheduler::{MIN_PERIOD_SECS, PollScheduler, TickHandler, effective_period};
pub use sinks::{CommandNotifier, FileBadge, LogBadge, LogNotifier};
