//! Authorization gate
//!
//! Composes header extraction with token validation so handlers receive a
//! verified user id, and holds the two authorization checks that follow it:
//! resource ownership and the service-caller API key.

use super::bearer::{api_key_from_headers, bearer_from_headers, HeaderError};
use super::jwt::{validate_access_token_at, JwtConfig, JwtError};
use super::password::PasswordError;
use super::refresh::RefreshError;
use axum::http::HeaderMap;
use chirpy_core::{ChirpyError, ErrorKind};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the identity core to the HTTP layer
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Storage(#[from] ChirpyError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Forbidden")]
    Forbidden,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Header(e) => e.kind(),
            AuthError::Token(e) => e.kind(),
            // A presented refresh token that was never issued is a failed credential
            AuthError::Refresh(RefreshError::NotFound) => ErrorKind::Authentication,
            AuthError::Refresh(e) => e.kind(),
            AuthError::Password(e) => e.kind(),
            AuthError::Storage(e) => e.kind(),
            AuthError::InvalidInput(_) => ErrorKind::Validation,
            AuthError::InvalidCredentials | AuthError::InvalidApiKey => ErrorKind::Authentication,
            AuthError::Forbidden => ErrorKind::Authorization,
        }
    }
}

/// Stateless gate in front of protected operations
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    jwt: JwtConfig,
}

impl AuthorizationGate {
    pub fn new(jwt: JwtConfig) -> Self {
        Self { jwt }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Resolve the caller from a `Bearer` access token
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        self.authenticate_at(headers, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuthError> {
        let token = bearer_from_headers(headers)?;
        Ok(validate_access_token_at(&self.jwt, token, now)?)
    }

    /// Only the owner of a resource may mutate it
    pub fn authorize_ownership(user_id: Uuid, owner_id: Uuid) -> Result<(), AuthError> {
        if user_id == owner_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Check an `ApiKey` header against the configured service key
    pub fn authenticate_service_caller(
        headers: &HeaderMap,
        expected_key: &str,
    ) -> Result<(), AuthError> {
        let presented = api_key_from_headers(headers)?;

        if !expected_key.is_empty() && constant_time_eq(presented, expected_key) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

/// Compare two secrets without an early exit
///
/// Both sides are hashed first so the comparison always runs over 32 bytes,
/// whatever the input lengths.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());

    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
