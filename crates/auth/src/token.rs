//! JWT access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{DocumentId, UserId};
use domain::Role;

use crate::error::{AuthError, Result};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user's id.
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
///
/// The `jti` identifies the token in the revocation store; a refresh
/// token whose `jti` is no longer stored has been revoked or rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh token pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies the two token kinds with their own secrets and
/// lifetimes.
#[derive(Clone)]
pub struct TokenSigner {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    /// Creates a signer from the two secrets and lifetimes in seconds.
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Issues an access token for a user.
    pub fn issue_access(&self, user_id: UserId, username: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.as_uuid(),
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.access_encoding)?)
    }

    /// Issues a refresh token for a user, returning the token and the
    /// `jti` to persist in the revocation store.
    pub fn issue_refresh(&self, user_id: UserId) -> Result<(String, DocumentId)> {
        let now = Utc::now();
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            sub: user_id.as_uuid(),
            jti,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.refresh_encoding)?;
        Ok((token, DocumentId::from_uuid(jti)))
    }

    /// Verifies an access token's signature and expiry.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verifies a refresh token's signature and expiry.
    ///
    /// Revocation is checked separately against the stored `jti`.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Returns how long refresh tokens live.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("access-secret", "refresh-secret", 900, 86400)
    }

    #[test]
    fn access_token_roundtrip() {
        let signer = signer();
        let user_id = UserId::new();

        let token = signer.issue_access(user_id, "ada", Role::Admin).unwrap();
        let claims = signer.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user_id.as_uuid());
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_its_jti() {
        let signer = signer();
        let user_id = UserId::new();

        let (token, jti) = signer.issue_refresh(user_id).unwrap();
        let claims = signer.verify_refresh(&token).unwrap();

        assert_eq!(claims.sub, user_id.as_uuid());
        assert_eq!(claims.jti, jti.as_uuid());
    }

    #[test]
    fn tokens_do_not_cross_verify() {
        let signer = signer();
        let user_id = UserId::new();

        let access = signer.issue_access(user_id, "ada", Role::User).unwrap();
        let (refresh, _) = signer.issue_refresh(user_id).unwrap();

        // Signed with different secrets, so each kind only verifies as itself.
        assert!(matches!(
            signer.verify_refresh(&access),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            signer.verify_access(&refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = signer();
        let token = signer
            .issue_access(UserId::new(), "ada", Role::User)
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(matches!(
            signer.verify_access(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // TTL far enough in the past to beat the default leeway.
        let signer = TokenSigner::new("a", "r", -120, -120);
        let token = signer
            .issue_access(UserId::new(), "ada", Role::User)
            .unwrap();

        assert!(matches!(
            signer.verify_access(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
