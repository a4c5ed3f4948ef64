//! Chirpy Core - Domain models, error kinds, configuration and storage
//!
//! This crate defines the shared building blocks of the Chirpy service:
//! - Domain models (users, chirps, refresh token records)
//! - Error kinds shared by every layer
//! - Configuration management
//! - Content moderation for chirp bodies
//! - The datastore collaborator (PostgreSQL and in-memory)

pub mod config;
pub mod moderation;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use moderation::{clean_body, validate_chirp_body, MAX_CHIRP_LENGTH};
pub use store::{
    ChirpRepository, MemoryStore, PgStore, RefreshTokenRepository, Store, UserRepository,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Classification shared by every error in the service.
///
/// Components report a kind; only the HTTP layer turns kinds into status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input (bad header shape, invalid body)
    Validation,
    /// Bad credentials or an invalid, expired or malformed token
    Authentication,
    /// Valid identity, forbidden action
    Authorization,
    /// Unknown token or resource
    NotFound,
    /// Hashing, signing or storage failure
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::NotFound => write!(f, "not_found"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Core error types for Chirpy operations
#[derive(Error, Debug)]
pub enum ChirpyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ChirpyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::DatabaseError(_) | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChirpyError>;

// ============================================================================
// Users
// ============================================================================

/// User account as stored by the datastore
///
/// The password hash is a self-describing argon2 record and is never
/// serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    /// Privileged (paid) account flag
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, not yet persisted, user
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Chirps
// ============================================================================

/// A short post authored by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Chirp {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chirp {
    pub fn new(user_id: Uuid, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ordering of chirp listings by creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = ChirpyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ChirpyError::ValidationError(format!(
                "unknown sort order: {other}"
            ))),
        }
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

/// Persisted refresh token row
///
/// The opaque token value is the primary key. `expires_at` is fixed at
/// creation; `revoked_at` is set at most once and never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenStatus {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    pub fn new(
        token: impl Into<String>,
        user_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            user_id,
            expires_at,
            revoked_at: None,
            created_at: issued_at,
            updated_at: issued_at,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Revocation wins over expiry when both apply.
    pub fn status_at(&self, now: DateTime<Utc>) -> RefreshTokenStatus {
        if self.is_revoked() {
            RefreshTokenStatus::Revoked
        } else if now >= self.expires_at {
            RefreshTokenStatus::Expired
        } else {
            RefreshTokenStatus::Active
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == RefreshTokenStatus::Active
    }
}
