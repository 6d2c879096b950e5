//! SQLite-backed storage.
//!
//! All collections share one `config` table keyed by `(collection, name)`,
//! so active, staging and snapshot data can live in a single database file.

use super::{not_found, StorageBackend, StorageResult};
use crate::domain::RawData;
use crate::error::StorageError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub const SCHEMA_VERSION: i64 = 1;

/// A connection shared by every collection opened from the same database.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub struct DatabaseStorage {
    collection: String,
    conn: SharedConnection,
}

impl DatabaseStorage {
    /// Open (creating if needed) the database at `path` and bind it to `collection`.
    pub fn open(path: &Path, collection: impl Into<String>) -> StorageResult<Self> {
        let collection = collection.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| backend_error(&collection, format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path).map_err(|e| backend_error(&collection, e))?;
        Self::with_connection(Arc::new(Mutex::new(conn)), collection)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory(collection: impl Into<String>) -> StorageResult<Self> {
        let collection = collection.into();
        let conn = Connection::open_in_memory().map_err(|e| backend_error(&collection, e))?;
        Self::with_connection(Arc::new(Mutex::new(conn)), collection)
    }

    /// Bind another collection to an already opened connection.
    pub fn with_connection(
        conn: SharedConnection,
        collection: impl Into<String>,
    ) -> StorageResult<Self> {
        let storage = Self { collection: collection.into(), conn };
        storage.ensure_schema()?;
        Ok(storage)
    }

    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_schema(&self) -> StorageResult<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS config (
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, name)
            );
            ",
        )
        .map_err(|e| backend_error(&self.collection, e))?;

        let current: Option<i64> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(|e| backend_error(&self.collection, e))?;
        match current {
            None => {
                conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])
                    .map_err(|e| backend_error(&self.collection, e))?;
            }
            Some(version) if version == SCHEMA_VERSION => {}
            Some(version) => {
                return Err(backend_error(
                    &self.collection,
                    format!(
                        "Unsupported config schema version {version}; expected {SCHEMA_VERSION}"
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn backend_error(collection: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend { collection: collection.to_string(), message: err.to_string() }
}

impl StorageBackend for DatabaseStorage {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn read(&self, name: &str) -> StorageResult<RawData> {
        let encoded: Option<String> = self
            .lock()
            .query_row(
                "SELECT data FROM config WHERE collection = ?1 AND name = ?2",
                params![self.collection, name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| backend_error(&self.collection, e))?;

        let encoded = encoded.ok_or_else(|| not_found(&self.collection, name))?;
        serde_json::from_str(&encoded).map_err(|e| StorageError::Read {
            collection: self.collection.clone(),
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn write(&self, name: &str, data: &RawData) -> StorageResult<()> {
        let write_error = |reason: String| StorageError::Write {
            collection: self.collection.clone(),
            name: name.to_string(),
            reason,
        };
        let encoded = serde_json::to_string(data).map_err(|e| write_error(e.to_string()))?;
        self.lock()
            .execute(
                "INSERT OR REPLACE INTO config(collection, name, data) VALUES(?1, ?2, ?3)",
                params![self.collection, name, encoded],
            )
            .map_err(|e| write_error(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let removed = self
            .lock()
            .execute(
                "DELETE FROM config WHERE collection = ?1 AND name = ?2",
                params![self.collection, name],
            )
            .map_err(|e| backend_error(&self.collection, e))?;
        if removed == 0 {
            return Err(not_found(&self.collection, name));
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.lock()
            .query_row(
                "SELECT 1 FROM config WHERE collection = ?1 AND name = ?2 LIMIT 1",
                params![self.collection, name],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(|e| backend_error(&self.collection, e))
    }

    fn list_all(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT name FROM config WHERE collection = ?1 ORDER BY name")
            .map_err(|e| backend_error(&self.collection, e))?;
        let rows = stmt
            .query_map(params![self.collection], |row| row.get::<_, String>(0))
            .map_err(|e| backend_error(&self.collection, e))?;

        let prefix = prefix.unwrap_or("");
        let mut names = Vec::new();
        for row in rows {
            let name = row.map_err(|e| backend_error(&self.collection, e))?;
            if name.starts_with(prefix) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn delete_all(&self, prefix: Option<&str>) -> StorageResult<usize> {
        let names = self.list_all(prefix)?;
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(|e| backend_error(&self.collection, e))?;
        for name in &names {
            tx.execute(
                "DELETE FROM config WHERE collection = ?1 AND name = ?2",
                params![self.collection, name],
            )
            .map_err(|e| backend_error(&self.collection, e))?;
        }
        tx.commit().map_err(|e| backend_error(&self.collection, e))?;
        Ok(names.len())
    }
}
