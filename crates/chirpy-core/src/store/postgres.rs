//! PostgreSQL storage backend
//!
//! Provides user, refresh token and chirp persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{ChirpRepository, RefreshTokenRepository, UserRepository};
use crate::{Chirp, ChirpyError, DatabaseConfig, RefreshToken, Result, SortOrder, User};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        is_chirpy_red BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        token TEXT PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at TIMESTAMPTZ NOT NULL,
        revoked_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chirps (
        id UUID PRIMARY KEY,
        body TEXT NOT NULL,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS chirps_user_id_idx ON chirps (user_id)",
];

const USER_COLUMNS: &str = "id, email, hashed_password, is_chirpy_red, created_at, updated_at";

/// PostgreSQL store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Initialize schema (idempotent, run at startup)
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| ChirpyError::DatabaseError(format!("Failed to init schema: {e}")))?;
        }

        tracing::info!("Database schema initialized");
        Ok(())
    }
}

/// Map an insert/update failure, turning a unique violation into a validation error
fn write_error(err: sqlx::Error, context: &str, duplicate: &str) -> ChirpyError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ChirpyError::ValidationError(duplicate.to_string())
        }
        _ => ChirpyError::DatabaseError(format!("{context}: {err}")),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(user.is_chirpy_red)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "Failed to create user", "Email already registered"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to fetch user: {e}")))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to fetch user: {e}")))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User> {
        let query = format!(
            "UPDATE users SET email = $2, hashed_password = $3, updated_at = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(email)
            .bind(hashed_password)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "Failed to update user", "Email already registered"))?
            .ok_or_else(|| ChirpyError::NotFound(format!("user {id}")))
    }

    async fn upgrade_to_red(&self, id: Uuid) -> Result<User> {
        let query = format!(
            "UPDATE users SET is_chirpy_red = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to upgrade user: {e}")))?
            .ok_or_else(|| ChirpyError::NotFound(format!("user {id}")))
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to delete users: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn insert(&self, token: RefreshToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked_at, created_at, updated_at)
            VALUES ($1, $2, $3, NULL, $4, $5)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ChirpyError::DatabaseError(format!("Failed to store refresh token: {e}")))?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT token, user_id, expires_at, revoked_at, created_at, updated_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChirpyError::DatabaseError(format!("Failed to fetch refresh token: {e}")))
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        // A single-row UPDATE; the row lock orders it against concurrent reads
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, updated_at = $2 WHERE token = $1 AND revoked_at IS NULL",
        )
        .bind(token)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| ChirpyError::DatabaseError(format!("Failed to revoke refresh token: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ChirpRepository for PgStore {
    async fn create_chirp(&self, chirp: Chirp) -> Result<Chirp> {
        sqlx::query_as::<_, Chirp>(
            r#"
            INSERT INTO chirps (id, body, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, body, user_id, created_at, updated_at
            "#,
        )
        .bind(chirp.id)
        .bind(&chirp.body)
        .bind(chirp.user_id)
        .bind(chirp.created_at)
        .bind(chirp.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ChirpyError::DatabaseError(format!("Failed to create chirp: {e}")))
    }

    async fn list_chirps(&self, author: Option<Uuid>, sort: SortOrder) -> Result<Vec<Chirp>> {
        let direction = match sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let query = format!(
            r#"
            SELECT id, body, user_id, created_at, updated_at
            FROM chirps
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at {direction}
            "#
        );

        sqlx::query_as::<_, Chirp>(&query)
            .bind(author)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to list chirps: {e}")))
    }

    async fn get_chirp(&self, id: Uuid) -> Result<Option<Chirp>> {
        sqlx::query_as::<_, Chirp>(
            "SELECT id, body, user_id, created_at, updated_at FROM chirps WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChirpyError::DatabaseError(format!("Failed to get chirp: {e}")))
    }

    async fn delete_chirp(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ChirpyError::DatabaseError(format!("Failed to delete chirp: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}
