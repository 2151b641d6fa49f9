//! Shopping cart endpoints. Every route operates on the caller's own
//! cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::DocumentId;
use doc_store::DocumentStore;
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{authenticate, envelope};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: DocumentId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub product_id: DocumentId,
    pub quantity: u32,
}

/// GET /cart — the caller's cart, empty if none exists yet.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let cart = state.carts.get_or_create(user.user_id).await?;
    Ok(envelope(serde_json::to_value(&cart.value)?))
}

/// POST /cart — add a product to the cart.
#[tracing::instrument(skip(state, headers))]
pub async fn add_item<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let cart = state
        .carts
        .add_item(user.user_id, req.product_id, req.quantity)
        .await?;
    Ok(envelope(serde_json::to_value(&cart.value)?))
}

/// PUT /cart — set the quantity of a cart line.
#[tracing::instrument(skip(state, headers))]
pub async fn update_item<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let cart = state
        .carts
        .update_item(user.user_id, req.product_id, req.quantity)
        .await?;
    Ok(envelope(serde_json::to_value(&cart.value)?))
}

/// DELETE /cart/clear — remove every line from the cart.
#[tracing::instrument(skip(state, headers))]
pub async fn clear<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let cart = state.carts.clear(user.user_id).await?;
    Ok(envelope(serde_json::to_value(&cart.value)?))
}

/// DELETE /cart/{productId} — remove one line from the cart.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_item<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let cart = state.carts.remove_item(user.user_id, product_id).await?;
    Ok(envelope(serde_json::to_value(&cart.value)?))
}
