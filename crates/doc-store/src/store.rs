use async_trait::async_trait;

use common::DocumentId;

use crate::{Document, Result, Version};

/// Options for writing a document to the store.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Expected version of the document for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl PutOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the document to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for document store implementations.
///
/// A document store persists JSON documents grouped into named collections,
/// keyed by [`DocumentId`]. Every write bumps the document's version; writes
/// may demand an expected version, which turns the write into a
/// compare-and-set. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieves a document by collection and id.
    ///
    /// Returns None if the document doesn't exist.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Writes a document, creating or replacing it.
    ///
    /// If `options.expected_version` is set, the operation fails with
    /// `VersionConflict` when the current version doesn't match. The
    /// initial version (0) means the document must not exist yet.
    ///
    /// Returns the new version of the document after the write.
    async fn put(
        &self,
        collection: &str,
        id: DocumentId,
        payload: serde_json::Value,
        options: PutOptions,
    ) -> Result<Version>;

    /// Deletes a document.
    ///
    /// Returns true if the document existed.
    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool>;

    /// Retrieves all documents in a collection whose payload contains
    /// the given JSON filter (an empty object matches everything).
    ///
    /// Documents are returned most recently written first.
    async fn find(&self, collection: &str, filter: serde_json::Value) -> Result<Vec<Document>>;
}

/// Checks whether `value` contains `filter`, with PostgreSQL `@>`
/// containment semantics: objects must contain every filter key with a
/// contained value, array elements of the filter must each be contained
/// in some element of the value, scalars must be equal.
pub fn json_contains(value: &serde_json::Value, filter: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (value, filter) {
        (Value::Object(value), Value::Object(filter)) => filter
            .iter()
            .all(|(key, f)| value.get(key).is_some_and(|v| json_contains(v, f))),
        (Value::Array(value), Value::Array(filter)) => filter
            .iter()
            .all(|f| value.iter().any(|v| json_contains(v, f))),
        (v, f) => v == f,
    }
}
