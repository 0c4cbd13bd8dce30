//! Shared identifier and entity vocabulary

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary key type
pub type Id = i64;

/// Business entity types that can carry attachments
///
/// The attachment subsystem itself treats entity types as opaque string
/// keys; this enum is the caller-side vocabulary for the known types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Companies,
    Locations,
    Devices,
    Invoices,
}

/// Error for parsing an unknown entity type name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Locations => "locations",
            Self::Devices => "devices",
            Self::Invoices => "invoices",
        }
    }

    pub fn all() -> &'static [EntityType] {
        &[
            Self::Companies,
            Self::Locations,
            Self::Devices,
            Self::Invoices,
        ]
    }
}

impl std::str::FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "companies" => Ok(Self::Companies),
            "locations" => Ok(Self::Locations),
            "devices" => Ok(Self::Devices),
            "invoices" => Ok(Self::Invoices),
            other => Err(UnknownEntityType(other.to_string())),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
