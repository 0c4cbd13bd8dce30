//! # arcadia-attachments
//!
//! Attachment metadata cache and subscription engine for Arcadia.
//!
//! Tracks, per business entity, the list of files attached to it, keeps
//! independent consumers consistent with a single source of truth, and
//! survives restarts through a durable JSON store. Binary content, upload
//! endpoints, and blob storage live elsewhere; this crate only handles
//! metadata.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arcadia_attachments::{AttachmentCache, AttachmentRecord, EntityKey, MemoryStore};
//!
//! let cache = AttachmentCache::new(Arc::new(MemoryStore::new()));
//! let key = EntityKey::new("companies", 5);
//!
//! // The upload subsystem registers a finished upload:
//! cache.manager().add(
//!     &key,
//!     AttachmentRecord::new(1, "contract.pdf", "application/pdf", 2048, "/files/1"),
//! );
//!
//! // Consumers get a reference-stable snapshot:
//! let attachments = cache.attachments(&key);
//! assert_eq!(attachments[0].filename, "contract.pdf");
//! ```

pub mod cache;
pub mod manager;
pub mod model;
pub mod snapshot;
pub mod store;

pub use cache::{AttachmentCache, AttachmentWatch};
pub use manager::{AttachmentManager, SubscriptionGuard};
pub use model::{AttachmentRecord, EntityKey};
pub use snapshot::{empty_snapshot, Snapshot, SnapshotCache};
pub use store::{CacheContents, CacheStore, JsonFileStore, MemoryStore, StoreError, StoreResult};
