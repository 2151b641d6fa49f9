//! Product review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::DocumentId;
use doc_store::DocumentStore;
use domain::ReviewDraft;
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{authenticate, envelope, versioned_json, versioned_list};

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewUpdateRequest {
    pub rating: u8,
    pub comment: Option<String>,
}

/// POST /reviews — review a product from a delivered order.
#[tracing::instrument(skip(state, headers, draft))]
pub async fn create<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&state, &headers)?;
    let review = state.reviews.create_review(user.user_id, draft).await?;
    Ok((StatusCode::CREATED, envelope(versioned_json(&review)?)))
}

/// GET /products/{id}/reviews — visible reviews for a product.
#[tracing::instrument(skip(state))]
pub async fn list_for_product<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<DocumentId>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Value>, ApiError> {
    let reviews = state
        .reviews
        .list_for_product(product_id, query.rating)
        .await?;
    Ok(envelope(versioned_list(&reviews)?))
}

/// PUT /reviews/{id} — edit the caller's own review.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
    Json(req): Json<ReviewUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let review = state
        .reviews
        .update_review(id, user.user_id, req.rating, req.comment)
        .await?;
    Ok(envelope(versioned_json(&review)?))
}

/// DELETE /reviews/{id} — delete a review (author or admin).
#[tracing::instrument(skip(state, headers))]
pub async fn delete<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    state
        .reviews
        .delete_review(id, user.user_id, user.is_admin())
        .await?;
    Ok(envelope(Value::Null))
}

/// PUT /reviews/{id}/like — bump a review's like counter.
#[tracing::instrument(skip(state, headers))]
pub async fn like<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    authenticate(&state, &headers)?;
    let review = state.reviews.like_review(id).await?;
    Ok(envelope(versioned_json(&review)?))
}
