use thiserror::Error;

use common::DocumentId;

use crate::Version;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrency conflict occurred when writing a document.
    /// The expected version did not match the actual version.
    #[error(
        "Version conflict for document {collection}/{id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        collection: String,
        id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// The document was not found in the store.
    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound {
        collection: String,
        id: DocumentId,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
