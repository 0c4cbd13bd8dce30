//! Memoized attachment snapshots
//!
//! Derived, reference-stable views over the manager's per-entity lists.
//! Equal content yields the identical `Arc`, so consumers comparing with
//! `Arc::ptr_eq` can skip recomputation. Every observed change is written
//! through to the durable store in full.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::model::{AttachmentRecord, EntityKey};
use crate::store::{CacheContents, CacheStore};

/// A reference-stable view of one entity's attachment list
pub type Snapshot = Arc<[AttachmentRecord]>;

// Shared across all caches and keys: an empty list never allocates.
static EMPTY_SNAPSHOT: Lazy<Snapshot> = Lazy::new(|| Vec::new().into());

/// Returns the process-wide empty snapshot
pub fn empty_snapshot() -> Snapshot {
    Arc::clone(&EMPTY_SNAPSHOT)
}

/// Memoized view cache keyed by storage key
///
/// Owns only derived views; the manager remains the source of truth.
/// Invariant: an entry stays pointer-identical across resolves until the
/// underlying list changes observably (different length, or a differing
/// `id`/`url` at some position).
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, Snapshot>>,
    store: Arc<dyn CacheStore>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_entries(store, CacheContents::new())
    }

    /// Create a cache seeded with restored contents
    pub fn with_entries(store: Arc<dyn CacheStore>, contents: CacheContents) -> Self {
        let entries = contents
            .into_iter()
            .map(|(key, list)| (key, Snapshot::from(list)))
            .collect();
        Self {
            entries: RwLock::new(entries),
            store,
        }
    }

    /// Resolve the stable snapshot for an entity's current list
    ///
    /// Returns the memoized reference when content is unchanged; otherwise
    /// replaces the entry, persists the full mapping, and returns the new
    /// reference.
    pub fn resolve(&self, key: &EntityKey, current: &[AttachmentRecord]) -> Snapshot {
        let storage_key = key.storage_key();

        {
            let entries = self.entries.read();
            match entries.get(&storage_key) {
                None if current.is_empty() => return empty_snapshot(),
                Some(cached) if unchanged(cached, current) => return Arc::clone(cached),
                _ => {}
            }
        }

        let fresh = Snapshot::from(current.to_vec());
        let contents = {
            let mut entries = self.entries.write();
            entries.insert(storage_key, Arc::clone(&fresh));
            contents_of(&entries)
        };
        self.persist(&contents);
        fresh
    }

    /// Drop the memoized entry for one entity
    pub fn clear(&self, key: &EntityKey) {
        let contents = {
            let mut entries = self.entries.write();
            if entries.remove(&key.storage_key()).is_none() {
                return;
            }
            contents_of(&entries)
        };
        debug!(key = %key, "Snapshot entry cleared");
        self.persist(&contents);
    }

    /// Drop every memoized entry
    pub fn clear_all(&self) {
        self.entries.write().clear();
        debug!("Snapshot cache cleared");
        self.persist(&CacheContents::new());
    }

    // Write failures leave the in-memory cache authoritative for the
    // rest of the process lifetime.
    fn persist(&self, contents: &CacheContents) {
        if let Err(e) = self.store.save(contents) {
            warn!(store = self.store.name(), error = %e, "Failed to persist attachment cache");
        }
    }
}

// Positional scan over id and url. A same-set reordering counts as a
// change; see the project design notes before altering this.
fn unchanged(cached: &[AttachmentRecord], current: &[AttachmentRecord]) -> bool {
    cached.len() == current.len()
        && cached
            .iter()
            .zip(current)
            .all(|(a, b)| a.id == b.id && a.url == b.url)
}

fn contents_of(entries: &HashMap<String, Snapshot>) -> CacheContents {
    entries
        .iter()
        .map(|(key, snapshot)| (key.clone(), snapshot.to_vec()))
        .collect()
}
