//! SQLite-backed key-value store.
//!
//! Holds host state that has to outlive the process, such as the clipboard
//! cooldown record.

use rusqlite::{params, Connection, OptionalExtension};
use shopview_core::{KeyValueStore, ShopviewError, ShopviewResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Database schema version for migrations
const SCHEMA_VERSION: i32 = 1;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> ShopviewResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            ShopviewError::storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Opened key-value store");
        Self::init(conn)
    }

    pub fn in_memory() -> ShopviewResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ShopviewError::storage(format!("Failed to open in-memory store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> ShopviewResult<Self> {
        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
                [],
                |row| row.get::<_, i32>(0).map(|count| count > 0),
            )
            .unwrap_or(false);

        let version: i32 = if table_exists {
            conn.query_row(
                "SELECT version FROM schema_version ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?
            .unwrap_or(0)
        } else {
            0
        };

        if version < SCHEMA_VERSION {
            create_schema_v1(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> ShopviewResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ShopviewError::storage("store connection poisoned"))
    }

    pub fn len(&self) -> ShopviewResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(storage_error)?;
        Ok(count as usize)
    }
}

fn storage_error(e: rusqlite::Error) -> ShopviewError {
    ShopviewError::storage(e.to_string())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Create initial schema (version 1)
fn create_schema_v1(conn: &Connection) -> ShopviewResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| ShopviewError::storage(format!("Failed to create schema: {}", e)))?;

    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, now_secs()],
    )
    .map_err(storage_error)?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>> {
        self.conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error)
    }

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()> {
        self.conn()?
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_secs()],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ShopviewResult<()> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopview_auth::{ClipboardCooldown, COOLDOWN_KEY};
    use std::sync::Arc;

    #[test]
    fn test_set_get_remove() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().unwrap(), 1);

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shopview.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", "v").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_cooldown_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shopview.db");

        {
            let store = Arc::new(SqliteStore::open(&path).unwrap());
            let mut cooldown = ClipboardCooldown::load(store, 600_000);
            cooldown.record_attempt(1_000);
        }

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        assert!(store.get(COOLDOWN_KEY).unwrap().is_some());
        let cooldown = ClipboardCooldown::load(store, 600_000);
        assert!(!cooldown.may_attempt(2_000));
        assert!(cooldown.may_attempt(601_000));
    }
}
