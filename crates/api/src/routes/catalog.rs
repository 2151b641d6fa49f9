//! Product, category and brand endpoints. Reads are public, writes
//! require an admin.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::DocumentId;
use doc_store::DocumentStore;
use domain::ProductDraft;
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{authenticate, envelope, require_admin, versioned_json, versioned_list};

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<DocumentId>,
}

#[derive(Debug, Deserialize)]
pub struct NamedDraft {
    pub name: String,
    pub description: Option<String>,
}

/// GET /products — list products, optionally filtered by category.
#[tracing::instrument(skip(state))]
pub async fn list_products<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Value>, ApiError> {
    let products = state.catalog.list_products(query.category).await?;
    Ok(envelope(versioned_list(&products)?))
}

/// GET /products/{id} — load a single product.
#[tracing::instrument(skip(state))]
pub async fn get_product<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let product = state.catalog.get_product(id).await?;
    Ok(envelope(versioned_json(&product)?))
}

/// POST /products — create a product (admin).
///
/// New products start with an empty inventory record so stock imports
/// work right away.
#[tracing::instrument(skip(state, headers, draft))]
pub async fn create_product<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let product = state.catalog.create_product(draft).await?;
    state.inventory.create(product.id, 0, 0, None).await?;

    Ok((StatusCode::CREATED, envelope(versioned_json(&product)?)))
}

/// PUT /products/{id} — update a product (admin).
#[tracing::instrument(skip(state, headers, draft))]
pub async fn update_product<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let product = state.catalog.update_product(id, draft).await?;
    Ok(envelope(versioned_json(&product)?))
}

/// DELETE /products/{id} — delete a product (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn delete_product<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    state.catalog.delete_product(id).await?;
    Ok(envelope(Value::Null))
}

/// GET /categories — list categories.
#[tracing::instrument(skip(state))]
pub async fn list_categories<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Value>, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(envelope(versioned_list(&categories)?))
}

/// POST /categories — create a category (admin).
#[tracing::instrument(skip(state, headers, draft))]
pub async fn create_category<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(draft): Json<NamedDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let category = state
        .catalog
        .create_category(draft.name, draft.description)
        .await?;
    Ok((StatusCode::CREATED, envelope(versioned_json(&category)?)))
}

/// DELETE /categories/{id} — delete a category (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn delete_category<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    state.catalog.delete_category(id).await?;
    Ok(envelope(Value::Null))
}

/// GET /brands — list brands.
#[tracing::instrument(skip(state))]
pub async fn list_brands<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Value>, ApiError> {
    let brands = state.catalog.list_brands().await?;
    Ok(envelope(versioned_list(&brands)?))
}

/// POST /brands — create a brand (admin).
#[tracing::instrument(skip(state, headers, draft))]
pub async fn create_brand<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(draft): Json<NamedDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    let brand = state
        .catalog
        .create_brand(draft.name, draft.description)
        .await?;
    Ok((StatusCode::CREATED, envelope(versioned_json(&brand)?)))
}

/// DELETE /brands/{id} — delete a brand (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn delete_brand<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    require_admin(&user)?;

    state.catalog.delete_brand(id).await?;
    Ok(envelope(Value::Null))
}
