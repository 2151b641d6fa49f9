//! Versioned JSON document store with optimistic concurrency control.
//!
//! Documents are grouped into named collections and keyed by [`DocumentId`].
//! Every write bumps the document version; callers that pass an expected
//! version get compare-and-set semantics, which is how the higher layers
//! serialize read-check-write sequences (inventory decrements, cart clears).

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::DocumentId;
pub use document::{Document, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use store::{DocumentStore, PutOptions, json_contains};
