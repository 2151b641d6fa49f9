//! Authentication: argon2 password hashing, JWT access/refresh pairs
//! and store-backed refresh-token revocation.

pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use error::{AuthError, Result};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, AuthUser, REFRESH_TOKENS, RefreshTokenRecord};
pub use token::{AccessClaims, RefreshClaims, TokenPair, TokenSigner};
