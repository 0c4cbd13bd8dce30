//! Attachment metadata model

use arcadia_core::{EntityType, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file
///
/// Describes a file attached to a business entity; never carries the
/// file's binary content. Immutable once created, identity is `id`.
/// Serializes with the durable-store field names (`mimeType`, `fileSize`,
/// `createdAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    /// Attachment ID, unique and stable
    pub id: Id,
    /// Original filename
    pub filename: String,
    /// MIME content type
    pub mime_type: String,
    /// File size in bytes
    pub file_size: i64,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
    /// Download URL
    pub url: String,
}

impl AttachmentRecord {
    /// Create a new attachment record
    pub fn new(
        id: Id,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        file_size: i64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            mime_type: mime_type.into(),
            file_size,
            created_at: Utc::now(),
            url: url.into(),
        }
    }

    /// Check if this is an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Composite key addressing the attachments of one business entity
///
/// The entity type is carried as an opaque string; callers working with
/// the known business types go through [`EntityKey::for_entity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: String,
    pub entity_id: Id,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, entity_id: Id) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }

    pub fn for_entity(entity_type: EntityType, entity_id: Id) -> Self {
        Self::new(entity_type.as_str(), entity_id)
    }

    /// The `"{entityType}-{entityId}"` form used to address the durable store
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.entity_type, self.entity_id)
    }

    /// Parse a durable-store key back into an entity key
    ///
    /// The id is the part after the last `-`, so entity type names may
    /// themselves contain dashes.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (entity_type, id) = key.rsplit_once('-')?;
        if entity_type.is_empty() {
            return None;
        }
        Some(Self::new(entity_type, id.parse().ok()?))
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.entity_type, self.entity_id)
    }
}
