//! SQLite-backed cache, readable by other processes after a restart.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::AlertCache;
use amwatch_core::types::{CacheEntry, CacheKind, CachePayload};

use super::next_timestamp;

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// Cache stored in a SQLite database, one row per `(instance, kind)`.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open or create a cache database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AmwatchError::DirectoryCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let conn = Connection::open(path).map_err(|e| sql_error("open", e))?;
        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        cache.migrate()?;
        debug!(path = %path.display(), "Opened cache database");
        Ok(cache)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| sql_error("open", e))?;
        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        cache.migrate()?;
        Ok(cache)
    }

    fn lock(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AmwatchError::cache(operation, format!("failed to acquire lock: {e}")))
    }

    /// Run database migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock("migrate")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )
        .map_err(|e| sql_error("migrate", e))?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|e| sql_error("migrate", e))?;

        if current_version < SCHEMA_VERSION {
            info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running cache migrations"
            );
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS cache_entries (
                    instance_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    timestamp_us INTEGER NOT NULL,
                    PRIMARY KEY (instance_id, kind)
                );
                INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
            )
            .map_err(|e| sql_error("migrate", e))?;
        }

        Ok(())
    }
}

fn sql_error(operation: &str, e: rusqlite::Error) -> AmwatchError {
    AmwatchError::cache(operation, e.to_string())
}

fn from_micros(operation: &str, micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| AmwatchError::cache(operation, format!("invalid timestamp {micros}")))
}

impl AlertCache for SqliteCache {
    fn put(&self, instance_id: &str, payload: CachePayload) -> Result<()> {
        let kind = payload.kind();
        let json = serde_json::to_string(&payload)
            .map_err(|e| AmwatchError::json("encoding cache payload", e))?;

        let conn = self.lock("put")?;
        let previous: Option<i64> = conn
            .query_row(
                "SELECT timestamp_us FROM cache_entries WHERE instance_id = ?1 AND kind = ?2",
                params![instance_id, kind.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| sql_error("put", e))?;
        let previous = previous.map(|us| from_micros("put", us)).transpose()?;

        // Stored at microsecond precision, so compare at that precision too.
        let now = from_micros("put", Utc::now().timestamp_micros())?;
        let timestamp = next_timestamp(now, previous);

        conn.execute(
            "INSERT INTO cache_entries (instance_id, kind, payload, timestamp_us)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(instance_id, kind)
             DO UPDATE SET payload = excluded.payload, timestamp_us = excluded.timestamp_us",
            params![instance_id, kind.as_str(), json, timestamp.timestamp_micros()],
        )
        .map_err(|e| sql_error("put", e))?;

        Ok(())
    }

    fn get(&self, instance_id: &str, kind: CacheKind) -> Result<Option<CacheEntry>> {
        let conn = self.lock("get")?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT payload, timestamp_us FROM cache_entries WHERE instance_id = ?1 AND kind = ?2",
                params![instance_id, kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| sql_error("get", e))?;

        let Some((json, micros)) = row else {
            return Ok(None);
        };

        let payload: CachePayload = serde_json::from_str(&json)
            .map_err(|e| AmwatchError::json("decoding cache payload", e))?;
        Ok(Some(CacheEntry {
            payload,
            timestamp: from_micros("get", micros)?,
        }))
    }

    fn forget(&self, instance_id: &str) -> Result<()> {
        let conn = self.lock("forget")?;
        conn.execute(
            "DELETE FROM cache_entries WHERE instance_id = ?1",
            params![instance_id],
        )
        .map_err(|e| sql_error("forget", e))?;
        Ok(())
    }
}
