//! Authentication service: registration, login and refresh-token
//! rotation backed by the document store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{DocumentId, UserId};
use doc_store::{DocumentStore, PutOptions};
use domain::{Collection, Role, USERS, User};

use crate::error::{AuthError, Result};
use crate::password::{hash_password, verify_password};
use crate::token::{TokenPair, TokenSigner};

/// One record per live refresh token, keyed by the token's `jti`.
///
/// A refresh token is only honored while its record exists; rotation
/// and logout delete it. Keeping this in the store (instead of process
/// memory) makes revocation survive restarts and hold across instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub const REFRESH_TOKENS: Collection<RefreshTokenRecord> = Collection::new("refreshTokens");

/// The authenticated identity extracted from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Derives the stable user id for a username.
///
/// Keying user documents by a name-derived UUID makes registration's
/// create-if-absent write the uniqueness check: two concurrent
/// registrations of the same name contend on the same document.
fn user_id_for(username: &str) -> UserId {
    UserId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, username.as_bytes()))
}

/// Service for account and token operations.
pub struct AuthService<S> {
    store: Arc<S>,
    signer: TokenSigner,
}

impl<S: DocumentStore> AuthService<S> {
    /// Creates a new auth service with the given store and token signer.
    pub fn new(store: Arc<S>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    /// Registers a new user with the default role and issues tokens.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = self.create_user(username, password, Role::User).await?;
        let tokens = self.issue_pair(&user).await?;
        Ok((user, tokens))
    }

    /// Creates a user account with an explicit role.
    ///
    /// Used by registration and by admin seeding.
    #[tracing::instrument(skip(self, password))]
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = username.trim();
        if username.len() < 3 {
            return Err(AuthError::Validation(
                "Username must be at least 3 characters".into(),
            ));
        }
        if password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }

        let user_id = user_id_for(username);
        let mut user = User::new(username.to_string(), hash_password(password)?);
        user.user_id = user_id;
        user.role = role;

        USERS
            .put(
                &*self.store,
                user_id.as_document_id(),
                &user,
                PutOptions::expect_new(),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AuthError::UsernameTaken(username.to_string())
                } else {
                    e.into()
                }
            })?;

        Ok(user)
    }

    /// Verifies credentials and issues a token pair.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let user_id = user_id_for(username.trim());
        let user = USERS
            .get(&*self.store, user_id.as_document_id())
            .await?
            .ok_or(AuthError::InvalidCredentials)?
            .value;

        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&user).await?;
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a fresh pair, rotating it.
    ///
    /// The old token's `jti` is deleted before the new pair is issued,
    /// so a token can only be redeemed once even under concurrent use.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.signer.verify_refresh(refresh_token)?;
        let jti = DocumentId::from_uuid(claims.jti);

        if !REFRESH_TOKENS.delete(&*self.store, jti).await? {
            // Already rotated or revoked.
            return Err(AuthError::InvalidToken);
        }

        let user_id = UserId::from_uuid(claims.sub);
        let user = USERS
            .get(&*self.store, user_id.as_document_id())
            .await?
            .ok_or(AuthError::InvalidToken)?
            .value;

        self.issue_pair(&user).await
    }

    /// Revokes a refresh token.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let claims = self.signer.verify_refresh(refresh_token)?;
        REFRESH_TOKENS
            .delete(&*self.store, DocumentId::from_uuid(claims.jti))
            .await?;
        Ok(())
    }

    /// Verifies an access token and returns the caller's identity.
    pub fn verify_access(&self, token: &str) -> Result<AuthUser> {
        let claims = self.signer.verify_access(token)?;
        Ok(AuthUser {
            user_id: UserId::from_uuid(claims.sub),
            username: claims.username,
            role: claims.role,
        })
    }

    async fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let access_token = self
            .signer
            .issue_access(user.user_id, &user.username, user.role)?;
        let (refresh_token, jti) = self.signer.issue_refresh(user.user_id)?;

        let now = Utc::now();
        let record = RefreshTokenRecord {
            user_id: user.user_id,
            issued_at: now,
            expires_at: now + self.signer.refresh_ttl(),
        };
        REFRESH_TOKENS
            .put(&*self.store, jti, &record, PutOptions::expect_new())
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
