//! Authentication service layer
//!
//! Business logic for registration, login, access token refresh, refresh
//! token revocation and credential updates. Storage goes through the
//! repository traits, so the same service runs over PostgreSQL or memory.

use super::gate::AuthError;
use super::jwt::{generate_access_token_at, JwtConfig};
use super::password::{hash_password, verify_password, PasswordConfig, PasswordError};
use super::refresh::RefreshTokenStore;
use chirpy_core::{AuthConfig, Store, User, UserRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Email and password, used by registration, login and credential updates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// User information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login response: the user plus both tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    /// Access token (JWT)
    pub token: String,
    /// Opaque refresh token
    pub refresh_token: String,
}

/// Freshly minted access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Outcome of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user.into(),
            token: session.access_token,
            refresh_token: session.refresh_token,
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: RefreshTokenStore,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
}

impl AuthService {
    pub fn new(store: &Store, config: &AuthConfig) -> Self {
        Self {
            users: store.users.clone(),
            refresh_tokens: RefreshTokenStore::new(
                store.refresh_tokens.clone(),
                config.refresh_token_ttl_days,
            ),
            jwt_config: JwtConfig::from(config),
            password_config: PasswordConfig::from(config),
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - Newly created user
    /// * `Err(AuthError)` - Invalid input, duplicate email or hashing failure
    pub async fn register(&self, request: CredentialsRequest) -> Result<User, AuthError> {
        validate_credentials(&request)?;

        let hashed_password = self.hash(request.password).await?;
        let user = self
            .users
            .create_user(User::new(request.email, hashed_password))
            .await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Login with email and password
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, request: CredentialsRequest) -> Result<Session, AuthError> {
        self.login_at(request, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        request: CredentialsRequest,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify(request.password, user.hashed_password.clone()).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = generate_access_token_at(
            &self.jwt_config,
            user.id,
            self.jwt_config.access_ttl,
            now,
        )?;
        let (refresh_token, refresh_expires_at) =
            self.refresh_tokens.issue_at(user.id, now).await?;

        Ok(Session {
            user,
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Mint a new access token from a refresh token
    ///
    /// The refresh token is left untouched and can be used again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Uuid, String), AuthError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, String), AuthError> {
        let user_id = self.refresh_tokens.validate_at(refresh_token, now).await?;
        let access_token = generate_access_token_at(
            &self.jwt_config,
            user_id,
            self.jwt_config.access_ttl,
            now,
        )?;

        Ok((user_id, access_token))
    }

    /// Revoke a presented refresh token and return its owner
    ///
    /// A token that was never issued is reported; revoking an already
    /// revoked token succeeds.
    pub async fn revoke(&self, refresh_token: &str) -> Result<Uuid, AuthError> {
        let record = self.refresh_tokens.lookup(refresh_token).await?;
        self.refresh_tokens.revoke(refresh_token).await?;
        Ok(record.user_id)
    }

    /// Replace the authenticated user's email and password
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        request: CredentialsRequest,
    ) -> Result<User, AuthError> {
        validate_credentials(&request)?;

        let hashed_password = self.hash(request.password).await?;
        let user = self
            .users
            .update_credentials(user_id, &request.email, &hashed_password, Utc::now())
            .await?;

        tracing::info!(%user_id, "Updated user credentials");
        Ok(user)
    }

    // Argon2 is CPU bound; keep it off the async worker threads
    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let config = self.password_config.clone();
        let hashed = tokio::task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))??;
        Ok(hashed)
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::VerificationFailed(e.to_string()))??;
        Ok(matched)
    }
}

fn validate_credentials(request: &CredentialsRequest) -> Result<(), AuthError> {
    if !request.email.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email format".to_string()));
    }
    if request.password.is_empty() {
        return Err(AuthError::InvalidInput("Password is required".to_string()));
    }
    Ok(())
}
