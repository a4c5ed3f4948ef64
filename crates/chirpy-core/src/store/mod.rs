//! Datastore collaborator
//!
//! Row-oriented storage for users, refresh tokens and chirps. Every
//! operation is a single awaited call with no retry; failures surface
//! immediately as [`ChirpyError::DatabaseError`](crate::ChirpyError).
//!
//! Two backends implement the repository traits:
//! - [`PgStore`]: PostgreSQL via SQLx
//! - [`MemoryStore`]: process-local tables for tests and local development

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{Chirp, RefreshToken, Result, SortOrder, User};

/// User account storage
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; a taken email is a validation error
    async fn create_user(&self, user: User) -> Result<User>;

    /// Find a user by login email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Replace email and password hash
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User>;

    /// Set the privileged-account flag
    async fn upgrade_to_red(&self, id: Uuid) -> Result<User>;

    /// Delete every user together with their tokens and chirps
    async fn delete_all(&self) -> Result<u64>;
}

/// Refresh token storage
///
/// Implementations must order a `revoke` and a concurrent `find` on the same
/// token consistently: once `revoke` returns, `find` observes `revoked_at`.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a freshly issued token
    async fn insert(&self, token: RefreshToken) -> Result<()>;

    /// Fetch a token row by its value
    async fn find(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Set `revoked_at` if it is not set yet.
    ///
    /// Returns `true` when this call performed the revocation; revoking an
    /// already revoked or unknown token returns `false`.
    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<bool>;
}

/// Chirp storage
#[async_trait]
pub trait ChirpRepository: Send + Sync {
    async fn create_chirp(&self, chirp: Chirp) -> Result<Chirp>;

    /// List chirps by creation time, optionally restricted to one author
    async fn list_chirps(&self, author: Option<Uuid>, sort: SortOrder) -> Result<Vec<Chirp>>;

    async fn get_chirp(&self, id: Uuid) -> Result<Option<Chirp>>;

    /// Returns `false` if no chirp had this ID
    async fn delete_chirp(&self, id: Uuid) -> Result<bool>;
}

/// Handles to every repository, backed by one storage backend
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub chirps: Arc<dyn ChirpRepository>,
}

impl Store {
    /// Share a single backend across all repositories
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: UserRepository + RefreshTokenRepository + ChirpRepository + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            refresh_tokens: backend.clone(),
            chirps: backend,
        }
    }

    /// Fresh, empty in-memory storage
    pub fn in_memory() -> Self {
        Self::from_backend(MemoryStore::new())
    }
}
