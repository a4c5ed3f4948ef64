//! In-memory storage backend
//!
//! All tables live behind one lock, so each repository call is atomic and
//! cascading deletes never leave orphaned rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChirpRepository, RefreshTokenRepository, UserRepository};
use crate::{Chirp, ChirpyError, RefreshToken, Result, SortOrder, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    chirps: HashMap<Uuid, Chirp>,
}

/// Process-local store for tests and local development
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(ChirpyError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(email, Some(id)) {
            return Err(ChirpyError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| ChirpyError::NotFound(format!("user {id}")))?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = at;

        Ok(user.clone())
    }

    async fn upgrade_to_red(&self, id: Uuid) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| ChirpyError::NotFound(format!("user {id}")))?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let deleted = tables.users.len() as u64;
        tables.users.clear();
        tables.refresh_tokens.clear();
        tables.chirps.clear();

        Ok(deleted)
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert(&self, token: RefreshToken) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&token.user_id) {
            return Err(ChirpyError::DatabaseError(format!(
                "refresh token references unknown user {}",
                token.user_id
            )));
        }
        if tables.refresh_tokens.contains_key(&token.token) {
            return Err(ChirpyError::DatabaseError(
                "duplicate refresh token".to_string(),
            ));
        }

        tables.refresh_tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(self.tables.read().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(token) {
            Some(row) if row.revoked_at.is_none() => {
                row.revoked_at = Some(at);
                row.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ChirpRepository for MemoryStore {
    async fn create_chirp(&self, chirp: Chirp) -> Result<Chirp> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&chirp.user_id) {
            return Err(ChirpyError::DatabaseError(format!(
                "chirp references unknown user {}",
                chirp.user_id
            )));
        }

        tables.chirps.insert(chirp.id, chirp.clone());
        Ok(chirp)
    }

    async fn list_chirps(&self, author: Option<Uuid>, sort: SortOrder) -> Result<Vec<Chirp>> {
        let tables = self.tables.read().await;
        let mut chirps: Vec<Chirp> = tables
            .chirps
            .values()
            .filter(|c| author.map_or(true, |id| c.user_id == id))
            .cloned()
            .collect();

        chirps.sort_by_key(|c| c.created_at);
        if sort == SortOrder::Desc {
            chirps.reverse();
        }

        Ok(chirps)
    }

    async fn get_chirp(&self, id: Uuid) -> Result<Option<Chirp>> {
        Ok(self.tables.read().await.chirps.get(&id).cloned())
    }

    async fn delete_chirp(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.chirps.remove(&id).is_some())
    }
}
