//! Local session store for Hospus.
//!
//! A small SQLite key/value table that keeps the bearer token (and the
//! refresh token the server hands out alongside it) between runs. Every
//! function here is a thin wrapper over one SQL statement; callers decide
//! what the keys mean.

use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Key under which the access token is stored.
pub const AUTH_TOKEN_KEY: &str = "hospus_auth_token";
/// Key under which the refresh token is stored.
pub const REFRESH_TOKEN_KEY: &str = "hospus_refresh_token";

/// Key/value store backed by a single SQLite connection.
///
/// The connection sits behind a mutex so the store can be shared with the
/// worker threads that run background requests.
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Opens (or creates) the store at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the file
    /// cannot be opened, or the schema fails to apply.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::DataDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens a throwaway store that lives only as long as the value.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Reads the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Inserts or replaces the value under `key`.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    /// Deletes `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = KvStore::open_in_memory().unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn set_then_overwrite() {
        let store = KvStore::open_in_memory().unwrap();
        store.set(AUTH_TOKEN_KEY, "first").unwrap();
        store.set(AUTH_TOKEN_KEY, "second").unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = KvStore::open_in_memory().unwrap();
        store.set(REFRESH_TOKEN_KEY, "r").unwrap();
        store.remove(REFRESH_TOKEN_KEY).unwrap();
        store.remove(REFRESH_TOKEN_KEY).unwrap();
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.db");
        {
            let store = KvStore::open(&path).unwrap();
            store.set(AUTH_TOKEN_KEY, "persisted").unwrap();
        }
        let store = KvStore::open(&path).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("persisted"));
    }
}
