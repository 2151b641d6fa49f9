//! Route handlers and shared request plumbing.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod reviews;

use ::auth::AuthUser;
use axum::Json;
use axum::http::{HeaderMap, header};
use doc_store::DocumentStore;
use domain::Versioned;
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

/// Wraps response data in the success envelope.
pub(crate) fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Serializes a stored value with its document id injected.
pub(crate) fn versioned_json<T: Serialize>(doc: &Versioned<T>) -> Result<Value, ApiError> {
    let mut value = serde_json::to_value(&doc.value)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("id".to_string(), serde_json::to_value(doc.id)?);
    }
    Ok(value)
}

pub(crate) fn versioned_list<T: Serialize>(docs: &[Versioned<T>]) -> Result<Value, ApiError> {
    let items: Result<Vec<Value>, ApiError> = docs.iter().map(versioned_json).collect();
    Ok(Value::Array(items?))
}

/// Resolves the caller from the `Authorization: Bearer` header.
pub(crate) fn authenticate<S: DocumentStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<AuthUser, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
    state.auth.verify_access(token).map_err(ApiError::from)
}

pub(crate) fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}
