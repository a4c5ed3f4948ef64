//! Refresh token issuance, lookup and revocation
//!
//! Refresh tokens are opaque: 256 random bits rendered as unpadded base64url.
//! The value itself is the row key in storage. A token is valid while it is
//! neither revoked nor past `expires_at`.
//!
//! Using a refresh token does not rotate it; the same token keeps working
//! until it expires or is revoked.

use base64::Engine;
use chirpy_core::{ChirpyError, ErrorKind, RefreshToken, RefreshTokenRepository, RefreshTokenStatus};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Default refresh token lifetime
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const TOKEN_BYTES: usize = 32;

/// Refresh token errors
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Refresh token not found")]
    NotFound,

    #[error("Refresh token has been revoked")]
    Revoked,

    #[error("Refresh token has expired")]
    Expired,

    #[error("Refresh token lifetime of {0} days is out of range")]
    LifetimeOutOfRange(i64),

    #[error(transparent)]
    Storage(#[from] ChirpyError),
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefreshError::NotFound => ErrorKind::NotFound,
            RefreshError::Revoked | RefreshError::Expired => ErrorKind::Authentication,
            RefreshError::LifetimeOutOfRange(_) => ErrorKind::Internal,
            RefreshError::Storage(e) => e.kind(),
        }
    }
}

/// Generate a cryptographically secure opaque token
pub fn generate_refresh_token() -> String {
    let mut token_bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut token_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Refresh token lifecycle on top of the storage collaborator
#[derive(Clone)]
pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
    ttl_days: i64,
}

impl RefreshTokenStore {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>, ttl_days: i64) -> Self {
        Self {
            repository,
            ttl_days,
        }
    }

    /// Expiry of a token issued at `now`
    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RefreshError> {
        Duration::try_days(self.ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(RefreshError::LifetimeOutOfRange(self.ttl_days))
    }

    /// Issue and persist a new token for `user_id`
    pub async fn issue(&self, user_id: Uuid) -> Result<(String, DateTime<Utc>), RefreshError> {
        self.issue_at(user_id, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), RefreshError> {
        let expires_at = self.expiry_from(now)?;
        let token = generate_refresh_token();

        self.repository
            .insert(RefreshToken::new(token.clone(), user_id, now, expires_at))
            .await?;

        tracing::debug!(%user_id, %expires_at, "Issued refresh token");
        Ok((token, expires_at))
    }

    /// Fetch the stored row for `token`
    pub async fn lookup(&self, token: &str) -> Result<RefreshToken, RefreshError> {
        self.repository
            .find(token)
            .await?
            .ok_or(RefreshError::NotFound)
    }

    /// True iff the token is neither revoked nor expired at `now`
    pub fn is_valid(record: &RefreshToken, now: DateTime<Utc>) -> bool {
        record.is_valid_at(now)
    }

    /// Resolve a presented token to its owner
    pub async fn validate(&self, token: &str) -> Result<Uuid, RefreshError> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, RefreshError> {
        let record = self.lookup(token).await?;

        match record.status_at(now) {
            RefreshTokenStatus::Active => Ok(record.user_id),
            RefreshTokenStatus::Revoked => Err(RefreshError::Revoked),
            RefreshTokenStatus::Expired => Err(RefreshError::Expired),
        }
    }

    /// Mark `token` revoked. Unknown or already revoked tokens are not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshError> {
        self.revoke_at(token, Utc::now()).await
    }

    pub async fn revoke_at(&self, token: &str, now: DateTime<Utc>) -> Result<(), RefreshError> {
        if self.repository.revoke(token, now).await? {
            tracing::debug!("Revoked refresh token");
        }
        Ok(())
    }
}
