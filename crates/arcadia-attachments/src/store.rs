//! Durable cache storage
//!
//! Persists the whole snapshot mapping as one JSON object keyed by
//! `"{entityType}-{entityId}"`. The store is a continuity cache, not a
//! system of record: callers treat every failure as "cache is cold".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::model::AttachmentRecord;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The full persisted mapping: storage key -> ordered attachment list
pub type CacheContents = HashMap<String, Vec<AttachmentRecord>>;

/// Durable storage for the snapshot cache
///
/// `load` runs once at startup; `save` rewrites the entire mapping after
/// every observed change.
pub trait CacheStore: Send + Sync {
    /// Read the persisted mapping
    ///
    /// A store that has never been written yields an empty mapping, not
    /// an error.
    fn load(&self) -> StoreResult<CacheContents>;

    /// Persist the entire mapping
    fn save(&self, contents: &CacheContents) -> StoreResult<()>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// JSON file store
///
/// The local-storage analog for a native process: one JSON document on
/// disk, rewritten in full on every save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> StoreResult<CacheContents> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No persisted cache, starting cold");
            return Ok(CacheContents::new());
        }

        let data = fs::read_to_string(&self.path)?;
        let contents: CacheContents = serde_json::from_str(&data)?;
        debug!(path = ?self.path, entries = contents.len(), "Cache loaded");
        Ok(contents)
    }

    fn save(&self, contents: &CacheContents) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string(contents)?;
        fs::write(&self.path, data)?;
        debug!(path = ?self.path, entries = contents.len(), "Cache saved");
        Ok(())
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// In-memory store for testing
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<CacheContents>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail, for degraded-mode tests
    pub fn failing() -> Self {
        Self {
            contents: Mutex::new(CacheContents::new()),
            fail_saves: true,
        }
    }

    /// Snapshot of what has been persisted so far
    pub fn persisted(&self) -> CacheContents {
        self.contents.lock().clone()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> StoreResult<CacheContents> {
        Ok(self.contents.lock().clone())
    }

    fn save(&self, contents: &CacheContents) -> StoreResult<()> {
        if self.fail_saves {
            return Err(StoreError::Io(std::io::Error::other("save disabled")));
        }
        *self.contents.lock() = contents.clone();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> JsonFileStore {
        let dir = std::env::temp_dir().join("arcadia-attachments-tests");
        std::fs::create_dir_all(&dir).unwrap();
        JsonFileStore::new(dir.join(format!("{}.json", uuid::Uuid::new_v4())))
    }

    fn sample_contents() -> CacheContents {
        let mut contents = CacheContents::new();
        contents.insert(
            "companies-5".to_string(),
            vec![
                AttachmentRecord::new(1, "a.pdf", "application/pdf", 10, "/files/1"),
                AttachmentRecord::new(2, "b.png", "image/png", 20, "/files/2"),
            ],
        );
        contents
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = temp_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let store = temp_store();
        let contents = sample_contents();

        store.save(&contents).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, contents);
        let list = &loaded["companies-5"];
        assert_eq!(list[0].id, 1);
        assert_eq!(list[1].id, 2);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let store = temp_store();
        std::fs::write(store.path(), "not json {").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn test_persisted_format_uses_storage_keys() {
        let store = temp_store();
        store.save(&sample_contents()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let list = json.get("companies-5").unwrap().as_array().unwrap();
        assert_eq!(list[0]["mimeType"], "application/pdf");
        assert_eq!(list[1]["fileSize"], 20);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        let contents = sample_contents();

        store.save(&contents).unwrap();
        assert_eq!(store.load().unwrap(), contents);

        let failing = MemoryStore::failing();
        assert!(failing.save(&contents).is_err());
        assert!(failing.load().unwrap().is_empty());
    }
}
