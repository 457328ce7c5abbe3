//! Durable blob storage.
//!
//! Every collection the engine owns is persisted as one JSON document under
//! its own key. Blobs are independent: there are no transactions spanning
//! keys, and each mutation rewrites only the blobs it touched.

use crate::error::StorageResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Keys of the persisted blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKey {
    /// Pages plus the persisted view cursor.
    Documents,
    /// The global revision log.
    History,
    /// Last-visit timestamps.
    Visited,
    /// Ordered pin list.
    Pinned,
    /// Outgoing link table.
    Links,
}

impl BlobKey {
    pub const ALL: [BlobKey; 5] = [
        BlobKey::Documents,
        BlobKey::History,
        BlobKey::Visited,
        BlobKey::Pinned,
        BlobKey::Links,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKey::Documents => "documents",
            BlobKey::History => "history",
            BlobKey::Visited => "visited",
            BlobKey::Pinned => "pinned",
            BlobKey::Links => "links",
        }
    }
}

/// A key/value store holding serialized blobs.
pub trait BlobStore {
    /// Read a blob, `None` if it was never written.
    fn get(&self, key: BlobKey) -> StorageResult<Option<String>>;

    /// Replace a blob.
    fn put(&mut self, key: BlobKey, value: &str) -> StorageResult<()>;

    /// Serialize `value` and store it under `key`.
    fn put_json<T: Serialize + ?Sized>(&mut self, key: BlobKey, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, &raw)
    }
}

/// SQLite-backed blob store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> StorageResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl BlobStore for SqliteStore {
    fn get(&self, key: BlobKey) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM blobs WHERE key = ?1",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: BlobKey, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.as_str(), value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Volatile blob store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: HashMap<BlobKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw blob, e.g. to simulate data written by an older version.
    pub fn with_blob(mut self, key: BlobKey, value: impl Into<String>) -> Self {
        self.blobs.insert(key, value.into());
        self
    }

    pub fn raw(&self, key: BlobKey) -> Option<&str> {
        self.blobs.get(&key).map(String::as_str)
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: BlobKey) -> StorageResult<Option<String>> {
        Ok(self.blobs.get(&key).cloned())
    }

    fn put(&mut self, key: BlobKey, value: &str) -> StorageResult<()> {
        self.blobs.insert(key, value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_roundtrip_and_overwrite() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get(BlobKey::Pinned).unwrap(), None);

        store.put(BlobKey::Pinned, "[\"Home\"]").unwrap();
        store.put(BlobKey::Pinned, "[\"Notes\"]").unwrap();

        assert_eq!(
            store.get(BlobKey::Pinned).unwrap().as_deref(),
            Some("[\"Notes\"]")
        );
        assert_eq!(store.get(BlobKey::Links).unwrap(), None);
    }

    #[test]
    fn test_sqlite_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wiki.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.put_json(BlobKey::Visited, &HashMap::from([("Home", 1)])).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get(BlobKey::Visited).unwrap().as_deref(),
            Some("{\"Home\":1}")
        );
    }

    #[test]
    fn test_memory_store_seeding() {
        let store = MemoryStore::new().with_blob(BlobKey::Links, "not json");
        assert_eq!(store.raw(BlobKey::Links), Some("not json"));
        assert_eq!(store.get(BlobKey::History).unwrap(), None);
    }

    #[test]
    fn test_blob_key_names_are_unique() {
        let mut names: Vec<_> = BlobKey::ALL.iter().map(BlobKey::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BlobKey::ALL.len());
    }
}
