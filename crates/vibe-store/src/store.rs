//! Connection handling and schema
//!
//! One SQLite database holds every table:
//!
//! ```text
//! users ──< sites ──< versions
//!   │         └── agent_settings
//!   └── user_profiles
//! ```
//!
//! Deleting a site cascades to its versions and agent settings.

use crate::error::{Result, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    avatar_url  TEXT NOT NULL,
    credits     INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    bio         TEXT,
    website     TEXT,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sites (
    id                    TEXT PRIMARY KEY,
    user_id               TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title                 TEXT NOT NULL,
    subdomain             TEXT NOT NULL UNIQUE,
    custom_domain         TEXT,
    custom_domain_status  TEXT,
    is_published          INTEGER NOT NULL DEFAULT 0,
    current_version_id    TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sites_by_user ON sites(user_id, updated_at);

CREATE TABLE IF NOT EXISTS versions (
    id               TEXT PRIMARY KEY,
    site_id          TEXT NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    sequence_number  INTEGER NOT NULL,
    markup           TEXT NOT NULL,
    content_hash     TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    UNIQUE (site_id, sequence_number)
);

CREATE TABLE IF NOT EXISTS agent_settings (
    site_id     TEXT PRIMARY KEY REFERENCES sites(id) ON DELETE CASCADE,
    agent_name  TEXT NOT NULL,
    is_active   INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);
";

/// SQLite-backed site repository
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::with_connection(conn, Some(path))?;
        tracing::info!("Opened site store at {}", store.path_display());
        Ok(store)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Database file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string())
    }

    /// Run `op` on the blocking pool
    pub(crate) async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Column text for a timestamp
///
/// Fixed-width UTC so text order is time order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid {column}: {e}")))
}

pub(crate) fn parse_id<T>(column: &str, raw: &str) -> Result<T>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::Corrupt(format!("invalid {column}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vibe_core::SiteId;

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vibe.sqlite3");

        let store = SqliteStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn schema_is_reapplied_safely() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vibe.sqlite3");
        drop(SqliteStore::open(&path).unwrap());
        assert!(SqliteStore::open(&path).is_ok());
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let enabled: i64 = store
            .conn
            .lock()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn timestamps_sort_as_text() {
        let earlier = timestamp(Utc::now());
        let later = timestamp(Utc::now() + chrono::Duration::milliseconds(5));
        assert!(earlier < later);
        assert_eq!(timestamp(parse_timestamp("t", &earlier).unwrap()), earlier);
    }

    #[test]
    fn bad_ids_are_corrupt() {
        assert!(matches!(
            parse_id::<SiteId>("site id", "nope"),
            Err(StoreError::Corrupt(msg)) if msg.contains("site id")
        ));
    }
}
