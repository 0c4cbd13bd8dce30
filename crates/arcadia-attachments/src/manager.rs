//! Attachment manager
//!
//! The single source of truth for per-entity attachment lists. Holds the
//! authoritative ordered list of [`AttachmentRecord`]s for each
//! [`EntityKey`] together with a registry of subscribers interested in
//! that key. Mutations come from the upload/delete subsystem; everything
//! else reads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arcadia_core::Id;
use parking_lot::RwLock;
use tracing::debug;

use crate::model::{AttachmentRecord, EntityKey};

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct ManagerState {
    lists: RwLock<HashMap<EntityKey, Vec<AttachmentRecord>>>,
    subscribers: RwLock<HashMap<EntityKey, Vec<Subscriber>>>,
    next_subscriber: AtomicU64,
}

/// Source of truth for per-entity attachment lists
///
/// Cheaply cloneable; clones share the same state. Subscribers for a key
/// are notified after every mutation of that key and only that key, once
/// the list has fully settled.
#[derive(Clone, Default)]
pub struct AttachmentManager {
    state: Arc<ManagerState>,
}

impl AttachmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager seeded with restored per-key lists
    pub fn with_lists(lists: HashMap<EntityKey, Vec<AttachmentRecord>>) -> Self {
        Self {
            state: Arc::new(ManagerState {
                lists: RwLock::new(lists),
                ..Default::default()
            }),
        }
    }

    /// Current attachment list for an entity
    ///
    /// Total: unknown keys yield an empty list.
    pub fn attachments(&self, key: &EntityKey) -> Vec<AttachmentRecord> {
        self.state
            .lists
            .read()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Append an attachment to an entity's list
    ///
    /// Called by the upload subsystem after a successful upload.
    pub fn add(&self, key: &EntityKey, record: AttachmentRecord) {
        {
            let mut lists = self.state.lists.write();
            lists.entry(key.clone()).or_default().push(record);
        }
        self.notify(key);
    }

    /// Remove an attachment from an entity's list by id
    ///
    /// Called by the delete subsystem after a successful deletion.
    /// Returns whether a record was removed; subscribers are only
    /// notified when one was.
    pub fn remove(&self, key: &EntityKey, id: Id) -> bool {
        let removed = {
            let mut lists = self.state.lists.write();
            match lists.get_mut(key) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|a| a.id != id);
                    let removed = list.len() != before;
                    if list.is_empty() {
                        lists.remove(key);
                    }
                    removed
                }
                None => false,
            }
        };

        if removed {
            self.notify(key);
        }
        removed
    }

    /// Install a full list for an entity, replacing any previous one
    ///
    /// Used when a fetch brings server truth for the whole entity.
    pub fn replace(&self, key: &EntityKey, records: Vec<AttachmentRecord>) {
        {
            let mut lists = self.state.lists.write();
            if records.is_empty() {
                lists.remove(key);
            } else {
                lists.insert(key.clone(), records);
            }
        }
        self.notify(key);
    }

    /// Register a subscriber for one entity's attachment changes
    ///
    /// The callback runs at least once after any mutation affecting the
    /// key. Dropping the returned guard unsubscribes immediately.
    pub fn subscribe(
        &self,
        key: &EntityKey,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionGuard {
        let id = self.state.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let subscriber = Subscriber {
            id,
            callback: Arc::new(callback),
        };

        self.state
            .subscribers
            .write()
            .entry(key.clone())
            .or_default()
            .push(subscriber);

        debug!(key = %key, subscriber = id, "Subscriber registered");

        SubscriptionGuard {
            state: Arc::downgrade(&self.state),
            key: key.clone(),
            id,
        }
    }

    /// Number of live subscribers for a key
    pub fn subscriber_count(&self, key: &EntityKey) -> usize {
        self.state
            .subscribers
            .read()
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    // Callbacks run outside the locks so they can read back through
    // `attachments` and observe the settled state.
    fn notify(&self, key: &EntityKey) {
        let callbacks: Vec<Callback> = self
            .state
            .subscribers
            .read()
            .get(key)
            .map(|subs| subs.iter().map(|s| Arc::clone(&s.callback)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback();
        }
    }
}

/// Handle for an active subscription
///
/// Unsubscribes on drop. Already-delivered notifications are not rolled
/// back; no further callbacks are delivered after the drop returns.
pub struct SubscriptionGuard {
    state: Weak<ManagerState>,
    key: EntityKey,
    id: u64,
}

impl SubscriptionGuard {
    /// Explicitly end the subscription
    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };

        let mut subscribers = state.subscribers.write();
        if let Some(subs) = subscribers.get_mut(&self.key) {
            subs.retain(|s| s.id != self.id);
            if subs.is_empty() {
                subscribers.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn record(id: Id, filename: &str) -> AttachmentRecord {
        AttachmentRecord::new(id, filename, "application/pdf", 100, format!("/files/{id}"))
    }

    #[test]
    fn test_unknown_key_is_empty() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("companies", 1);
        assert!(manager.attachments(&key).is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("companies", 5);

        manager.add(&key, record(1, "a.pdf"));
        manager.add(&key, record(2, "b.pdf"));
        assert_eq!(manager.attachments(&key).len(), 2);

        assert!(manager.remove(&key, 1));
        let remaining = manager.attachments(&key);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);

        assert!(!manager.remove(&key, 99));
    }

    #[test]
    fn test_replace_installs_full_list() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("devices", 3);

        manager.add(&key, record(1, "old.pdf"));
        manager.replace(&key, vec![record(10, "x.pdf"), record(11, "y.pdf")]);

        let list = manager.attachments(&key);
        assert_eq!(list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![10, 11]);
    }

    #[test]
    fn test_notification_only_for_mutated_key() {
        let manager = AttachmentManager::new();
        let companies = EntityKey::new("companies", 5);
        let locations = EntityKey::new("locations", 5);

        let company_calls = Arc::new(AtomicUsize::new(0));
        let location_calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&company_calls);
        let _g1 = manager.subscribe(&companies, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let l = Arc::clone(&location_calls);
        let _g2 = manager.subscribe(&locations, move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        manager.add(&companies, record(1, "a.pdf"));

        assert_eq!(company_calls.load(Ordering::SeqCst), 1);
        assert_eq!(location_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscriber_observes_settled_state() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("invoices", 9);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_callback = Arc::clone(&seen);
        let reader = manager.clone();
        let read_key = key.clone();
        let _guard = manager.subscribe(&key, move || {
            seen_in_callback.store(reader.attachments(&read_key).len(), Ordering::SeqCst);
        });

        manager.add(&key, record(1, "a.pdf"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        manager.add(&key, record(2, "b.pdf"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_guard_stops_delivery() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("companies", 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let guard = manager.subscribe(&key, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(manager.subscriber_count(&key), 1);

        manager.add(&key, record(1, "a.pdf"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        guard.unsubscribe();
        assert_eq!(manager.subscriber_count(&key), 0);

        manager.add(&key, record(2, "b.pdf"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_without_match_does_not_notify() {
        let manager = AttachmentManager::new();
        let key = EntityKey::new("companies", 1);
        manager.add(&key, record(1, "a.pdf"));

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let _guard = manager.subscribe(&key, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        manager.remove(&key, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_seeded_manager_serves_restored_lists() {
        let key = EntityKey::new("locations", 2);
        let mut lists = HashMap::new();
        lists.insert(key.clone(), vec![record(5, "map.png")]);

        let manager = AttachmentManager::with_lists(lists);
        assert_eq!(manager.attachments(&key)[0].id, 5);
    }
}
