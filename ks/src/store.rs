//! Core Store implementation

use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::record::Record;

/// Database file created inside the store directory
pub const DB_FILE_NAME: &str = "khirstore.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// Lightweight listing entry for a stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub id: String,
    pub updated_at: i64,
}

/// SQLite-backed record store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;
        let db_path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path).context(format!("Failed to open {}", db_path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        info!(path = %dir.display(), "Opened khirstore");
        Ok(store)
    }

    /// Open a throwaway store that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { conn };
        store.init_schema()?;
        debug!("Opened in-memory khirstore");
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Fetch a record by id
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        debug!(collection = T::collection_name(), %id, "get: called");
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![T::collection_name(), id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query record")?;

        match data {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .context(format!("Failed to decode {}/{}", T::collection_name(), id))?;
                Ok(Some(record))
            }
            None => {
                debug!(%id, "get: not found");
                Ok(None)
            }
        }
    }

    /// Insert or replace a record, keyed by its collection and id
    pub fn upsert<T: Record>(&self, record: &T) -> Result<()> {
        debug!(collection = T::collection_name(), id = %record.id(), "upsert: called");
        let json = serde_json::to_string(record).context("Failed to encode record")?;
        self.conn
            .execute(
                "INSERT INTO records (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![T::collection_name(), record.id(), json, record.updated_at()],
            )
            .context("Failed to write record")?;
        Ok(())
    }

    /// List records whose id starts with `prefix`, ordered by id
    pub fn list_with_prefix<T: Record>(&self, prefix: &str) -> Result<Vec<T>> {
        debug!(collection = T::collection_name(), %prefix, "list_with_prefix: called");
        let mut stmt = self.conn.prepare(
            "SELECT id, data FROM records
             WHERE collection = ?1 AND substr(id, 1, length(?2)) = ?2
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![T::collection_name(), prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, json) = row?;
            let record = serde_json::from_str(&json)
                .context(format!("Failed to decode {}/{}", T::collection_name(), id))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Fetch a record as untyped JSON
    pub fn get_raw(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
        debug!(%collection, %id, "get_raw: called");
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// List ids and timestamps in a collection without decoding the records
    pub fn summaries(&self, collection: &str) -> Result<Vec<RecordSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, updated_at FROM records WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok(RecordSummary {
                id: row.get(0)?,
                updated_at: row.get(1)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Names of all non-empty collections
    pub fn collections(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT collection FROM records ORDER BY collection")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}
