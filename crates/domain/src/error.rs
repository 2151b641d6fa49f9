//! Domain error types.

use doc_store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request was malformed or violates an entity rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity was not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The caller is not allowed to perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The entity is not in a state that permits this operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The operation raced a concurrent write or a uniqueness rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Creates a not-found error for an entity kind and id.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true if this error is a concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// Version conflicts surface as Conflict so callers can retry or map
// them to a 409 without digging into the store layer.
impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { .. } => DomainError::Conflict(e.to_string()),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
