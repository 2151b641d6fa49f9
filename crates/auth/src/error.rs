//! Authentication error types.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username or password. Deliberately does not distinguish
    /// between an unknown user and a bad password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The username is already registered.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// The token is malformed, expired, or has been revoked.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The request was malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// Token encoding failed.
    #[error("Token encoding error: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Convenience type alias for auth results.
pub type Result<T> = std::result::Result<T, AuthError>;
