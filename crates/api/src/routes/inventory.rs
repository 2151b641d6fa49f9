//! Inventory endpoints (admin only).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::DocumentId;
use doc_store::DocumentStore;
use domain::StockChangeType;
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{authenticate, envelope, require_admin, versioned_json};

#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub quantity: u32,
    #[serde(rename = "type")]
    pub change_type: StockChangeType,
}

/// GET /inventory/{productId} — inventory record for a product.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let inventory = state.inventory.get(product_id).await?;
    Ok(envelope(versioned_json(&inventory)?))
}

/// PUT /inventory/{productId}/stock — import, export or adjust stock.
#[tracing::instrument(skip(state, headers))]
pub async fn update_stock<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<DocumentId>,
    Json(req): Json<StockUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let inventory = state
        .inventory
        .update_stock(product_id, req.change_type, req.quantity)
        .await?;
    Ok(envelope(versioned_json(&inventory)?))
}
