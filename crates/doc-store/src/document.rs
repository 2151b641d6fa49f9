use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::DocumentId;

/// Version number for a document, used for optimistic concurrency control.
///
/// Versions start at 1 for a freshly written document and increment by 1
/// on every successful write.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) of a freshly written document.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored document along with its concurrency metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Identifier of the document within its collection.
    pub id: DocumentId,

    /// The version of the document after its last write.
    pub version: Version,

    /// The document body as JSON.
    pub payload: serde_json::Value,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document with the current time as its write timestamp.
    pub fn new(id: DocumentId, version: Version, payload: serde_json::Value) -> Self {
        Self {
            id,
            version,
            payload,
            updated_at: Utc::now(),
        }
    }

    /// Deserializes the payload into a typed value.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
