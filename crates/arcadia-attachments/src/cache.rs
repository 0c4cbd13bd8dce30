//! Attachment cache facade
//!
//! Ties the manager, snapshot cache, and durable store together behind
//! one constructible object with an injected persistence dependency.
//! Consumers read through [`AttachmentCache::attachments`] or keep an
//! [`AttachmentWatch`]; the upload/delete subsystem mutates through
//! [`AttachmentCache::manager`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::manager::{AttachmentManager, SubscriptionGuard};
use crate::model::{AttachmentRecord, EntityKey};
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::store::{CacheContents, CacheStore};

struct CacheInner {
    manager: AttachmentManager,
    snapshots: SnapshotCache,
}

/// Per-entity attachment cache with durable continuity
///
/// Construction loads the persisted mapping once, seeding both the
/// manager's initial lists and the memoized snapshots, so attachment
/// listings survive a restart without a round trip. Cheaply cloneable;
/// clones share state.
#[derive(Clone)]
pub struct AttachmentCache {
    inner: Arc<CacheInner>,
}

impl AttachmentCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        let contents = match store.load() {
            Ok(contents) => contents,
            Err(e) => {
                warn!(store = store.name(), error = %e, "Failed to load attachment cache, starting cold");
                CacheContents::new()
            }
        };

        let mut lists: HashMap<EntityKey, Vec<AttachmentRecord>> = HashMap::new();
        for (storage_key, records) in &contents {
            match EntityKey::from_storage_key(storage_key) {
                Some(key) => {
                    lists.insert(key, records.clone());
                }
                None => {
                    warn!(key = %storage_key, "Skipping malformed cache entry");
                }
            }
        }

        Self {
            inner: Arc::new(CacheInner {
                manager: AttachmentManager::with_lists(lists),
                snapshots: SnapshotCache::with_entries(store, contents),
            }),
        }
    }

    /// The underlying manager
    ///
    /// Mutation entry point for the upload/delete subsystem; all other
    /// callers are read-only.
    pub fn manager(&self) -> &AttachmentManager {
        &self.inner.manager
    }

    /// Current snapshot for an entity
    ///
    /// Reference-stable across calls while the entity's list is
    /// observably unchanged.
    pub fn attachments(&self, key: &EntityKey) -> Snapshot {
        self.inner
            .snapshots
            .resolve(key, &self.inner.manager.attachments(key))
    }

    /// Subscribe to one entity's attachment changes
    ///
    /// The listener receives the freshly resolved snapshot after every
    /// mutation of the key. Dropping the returned watch unsubscribes.
    pub fn watch(
        &self,
        key: &EntityKey,
        listener: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> AttachmentWatch {
        // The registry lives inside `inner`; a weak reference here keeps
        // the subscription from pinning the cache alive.
        let weak = Arc::downgrade(&self.inner);
        let watch_key = key.clone();
        let guard = self.inner.manager.subscribe(key, move || {
            if let Some(inner) = weak.upgrade() {
                let snapshot = inner
                    .snapshots
                    .resolve(&watch_key, &inner.manager.attachments(&watch_key));
                listener(snapshot);
            }
        });

        AttachmentWatch {
            inner: Arc::clone(&self.inner),
            key: key.clone(),
            _guard: guard,
        }
    }

    /// Invalidate the cached snapshot for one entity
    pub fn clear(&self, key: &EntityKey) {
        self.inner.snapshots.clear(key);
    }

    /// Invalidate every cached snapshot
    pub fn clear_all(&self) {
        self.inner.snapshots.clear_all();
    }
}

/// Live subscription to one entity's attachments
///
/// Holds the registration for its lifetime; dropping it stops delivery
/// immediately.
pub struct AttachmentWatch {
    inner: Arc<CacheInner>,
    key: EntityKey,
    _guard: SubscriptionGuard,
}

impl AttachmentWatch {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// The current snapshot, resolved against the manager's state
    pub fn current(&self) -> Snapshot {
        self.inner
            .snapshots
            .resolve(&self.key, &self.inner.manager.attachments(&self.key))
    }
}
