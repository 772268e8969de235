use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::models::LearnerRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// Key-value byte store boundary. One serialized record per key; any
// backend the host offers can sit behind this.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

// Identifies one learner's record for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub learner: String,
    pub subject: String,
}

impl RecordKey {
    pub fn new(learner: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            learner: learner.into(),
            subject: subject.into(),
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}::{}", self.learner, self.subject)
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM records WHERE key = ?1")?;

        match stmt.query_row(params![key], |row| row.get::<_, Vec<u8>>(0)) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO records (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// Backend for tests and embedding hosts that manage persistence
// themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// Record-level persistence: load/save/reset with the fallback policy.
// A missing, unparseable, or invalid stored record is treated as "no
// history" and replaced with defaults; only backend I/O surfaces as an
// error.
pub struct ProgressStore<S: Store> {
    backend: S,
}

impl<S: Store> ProgressStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn load(&self, key: &RecordKey) -> Result<LearnerRecord, StoreError> {
        let bytes = match self.backend.get(&key.storage_key())? {
            Some(bytes) => bytes,
            None => return Ok(LearnerRecord::default()),
        };

        match serde_json::from_slice::<LearnerRecord>(&bytes) {
            Ok(record) if record.is_valid() => Ok(record),
            _ => Ok(LearnerRecord::default()),
        }
    }

    pub fn save(&mut self, record: &LearnerRecord, key: &RecordKey) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record)?;
        self.backend.put(&key.storage_key(), &bytes)
    }

    pub fn reset(&mut self, key: &RecordKey) -> Result<LearnerRecord, StoreError> {
        self.backend.delete(&key.storage_key())?;
        let record = LearnerRecord::default();
        self.save(&record, key)?;
        Ok(record)
    }
}
