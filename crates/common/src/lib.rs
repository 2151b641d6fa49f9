//! Shared identifier types used across the storefront backend.

mod types;

pub use types::{DocumentId, UserId};
