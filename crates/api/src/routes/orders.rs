//! Order placement, queries and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use checkout::PlaceOrderRequest;
use common::DocumentId;
use doc_store::DocumentStore;
use domain::OrderStatus;
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{authenticate, envelope, require_admin, versioned_json, versioned_list};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

fn parse_status(value: &str) -> Result<OrderStatus, ApiError> {
    value.parse().map_err(ApiError::BadRequest)
}

/// POST /orders — place an order from the caller's cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&state, &headers)?;
    let order = state.checkout.place_order(user.user_id, req).await?;
    Ok((StatusCode::CREATED, envelope(versioned_json(&order)?)))
}

/// GET /orders — the caller's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let orders = state.checkout.list_orders(user.user_id, status).await?;
    Ok(envelope(versioned_list(&orders)?))
}

/// GET /orders/{id} — load an order, visible to its owner or an admin.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let order = state
        .checkout
        .get_order(id, user.user_id, user.is_admin())
        .await?;
    Ok(envelope(versioned_json(&order)?))
}

/// PUT /orders/{id}/status — move an order through its lifecycle (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_status<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let status = parse_status(&req.status)?;
    let order = state.checkout.update_status(id, status).await?;
    Ok(envelope(versioned_json(&order)?))
}

/// PUT /orders/{id}/cancel — cancel an order and restore its stock.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let order = state
        .checkout
        .cancel_order(id, user.user_id, user.is_admin())
        .await?;
    Ok(envelope(versioned_json(&order)?))
}
