//! API error types with HTTP response mapping.

use auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Authentication error.
    Auth(AuthError),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout orchestration error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => internal(&msg),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

// Store and serialization failures get a generic body; the detail only
// goes to the log.
fn internal(detail: &str) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn auth_error_to_response(err: AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials | AuthError::InvalidToken => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        AuthError::UsernameTaken(_) => (StatusCode::CONFLICT, err.to_string()),
        AuthError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        AuthError::Hashing(_) | AuthError::TokenEncoding(_) => internal(&err.to_string()),
        AuthError::Domain(err) => domain_error_to_response(err),
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation(_) | DomainError::InvalidState(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        DomainError::Store(_) | DomainError::Serialization(_) => internal(&err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::ProductUnavailable(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidState(_)
        | CheckoutError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        CheckoutError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        CheckoutError::Domain(err) => domain_error_to_response(err),
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
