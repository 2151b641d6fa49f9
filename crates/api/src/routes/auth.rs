//! Registration, login and token lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use doc_store::DocumentStore;
use domain::User;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::envelope;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// The password hash never leaves the server.
fn user_json(user: &User) -> Value {
    json!({
        "userId": user.user_id,
        "username": user.username,
        "role": user.role,
    })
}

/// POST /auth/register — create an account and issue tokens.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn register<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (user, tokens) = state.auth.register(&req.username, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        envelope(json!({
            "user": user_json(&user),
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        })),
    ))
}

/// POST /auth/login — verify credentials and issue tokens.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn login<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let (user, tokens) = state.auth.login(&req.username, &req.password).await?;

    Ok(envelope(json!({
        "user": user_json(&user),
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
    })))
}

/// POST /auth/refresh — rotate a refresh token.
#[tracing::instrument(skip(state, req))]
pub async fn refresh<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, ApiError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(envelope(serde_json::to_value(tokens)?))
}

/// POST /auth/logout — revoke a refresh token.
#[tracing::instrument(skip(state, req))]
pub async fn logout<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, ApiError> {
    state.auth.logout(&req.refresh_token).await?;
    Ok(envelope(Value::Null))
}
