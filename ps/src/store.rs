//! SQLite-backed record store

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{StoreError, now_ms};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id          TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,
    owner       TEXT,
    body        TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_collection ON records (collection, created_at);
CREATE INDEX IF NOT EXISTS idx_records_owner ON records (collection, owner);
";

/// A record as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord<T> {
    /// Record ID (UUID v7, time-ordered)
    pub id: String,
    /// Collection the record belongs to
    pub collection: String,
    /// Optional owning entity (e.g. the generation request)
    pub owner: Option<String>,
    /// Insertion time (unix ms)
    pub created_at: i64,
    /// Deserialized body
    pub body: T,
}

/// SQLite record store
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "Store::open: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        let store = Self { conn, path: Some(path) };
        store.migrate()?;
        info!(path = ?store.path, "Opened plan store");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Store::open_in_memory: called");
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Path of the backing database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<(), StoreError> {
        debug!("Store::migrate: called");
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a new record and return its generated ID
    pub fn insert<T: Serialize>(&self, collection: &str, owner: Option<&str>, body: &T) -> Result<String, StoreError> {
        check_collection(collection)?;
        let id = Uuid::now_v7().to_string();
        let json = serde_json::to_string(body)?;
        debug!(%collection, %id, ?owner, body_len = json.len(), "Store::insert: called");

        self.conn.execute(
            "INSERT INTO records (id, collection, owner, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, collection, owner, json, now_ms()],
        )?;
        Ok(id)
    }

    /// Fetch a record by ID
    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<StoredRecord<T>>, StoreError> {
        debug!(%collection, %id, "Store::get: called");
        let row = self
            .conn
            .query_row(
                "SELECT id, collection, owner, body, created_at FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some(raw) => Ok(Some(decode(raw)?)),
            None => {
                debug!(%id, "Store::get: not found");
                Ok(None)
            }
        }
    }

    /// List records in a collection, newest first, optionally filtered by owner
    pub fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        owner: Option<&str>,
    ) -> Result<Vec<StoredRecord<T>>, StoreError> {
        debug!(%collection, ?owner, "Store::list: called");
        let mut stmt = self.conn.prepare(
            "SELECT id, collection, owner, body, created_at FROM records
             WHERE collection = ?1 AND (?2 IS NULL OR owner = ?2)
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![collection, owner], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode(row?)?);
        }
        Ok(records)
    }

    /// Delete a record, returning whether it existed
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        debug!(%collection, %id, "Store::delete: called");
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE collection = ?1 AND id = ?2", params![collection, id])?;
        Ok(changed > 0)
    }

    /// Number of records in a collection
    pub fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

type RawRow = (String, String, Option<String>, String, i64);

fn decode<T: DeserializeOwned>((id, collection, owner, body, created_at): RawRow) -> Result<StoredRecord<T>, StoreError> {
    Ok(StoredRecord {
        id,
        collection,
        owner,
        created_at,
        body: serde_json::from_str(&body)?,
    })
}

fn check_collection(collection: &str) -> Result<(), StoreError> {
    let valid = !collection.is_empty() && collection.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}
