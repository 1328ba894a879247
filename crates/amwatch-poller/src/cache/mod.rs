//! Last-good alert and silence storage.
//!
//! Entries are only written after a successful fetch and are never cleared on
//! failure, so consumers can fall back to stale data. Staleness is judged by
//! the reader from the entry timestamp; timestamps strictly increase per
//! `(instance, kind)` key.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use chrono::{DateTime, Duration, Utc};

/// Timestamp for a write following `previous`.
///
/// Uses `now` unless the clock has not moved past the previous write, in
/// which case the previous timestamp is bumped by one millisecond.
pub(crate) fn next_timestamp(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}
