//! JWT access token generation and validation
//!
//! Access tokens are compact HS256 JWTs (`header.payload.signature`) carrying
//! only the registered claims `iss`, `sub`, `iat` and `exp`. They are
//! stateless: nothing is stored server-side and an issued token stays valid
//! until `exp`. Keep the lifetime short.
//!
//! The algorithm is pinned here. Whatever `alg` a presented token declares,
//! only HS256 with the configured secret is accepted.

use base64::Engine;
use chirpy_core::{AuthConfig, ErrorKind};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Fixed issuer of every access token
pub const ISSUER: &str = "chirpy";

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer (always "chirpy")
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
}

/// JWT token generation and validation errors
///
/// The three validation failures stay distinct even though the HTTP layer
/// answers all of them with 401.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    SigningFailed(String),
}

impl JwtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JwtError::SigningFailed(_) => ErrorKind::Internal,
            _ => ErrorKind::Authentication,
        }
    }
}

/// JWT Configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Access token lifetime
    pub access_ttl: Duration,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, access_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
        }
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            Duration::from_secs(config.access_token_ttl_secs),
        )
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .finish()
    }
}

/// Generate an access token for `user_id`, valid for `ttl` from now
pub fn generate_access_token(
    config: &JwtConfig,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, JwtError> {
    generate_access_token_at(config, user_id, ttl, Utc::now())
}

/// Generate an access token as if issued at `now`
pub fn generate_access_token_at(
    config: &JwtConfig,
    user_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, JwtError> {
    let iat = now.timestamp();
    let exp = i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| iat.checked_add(secs))
        .ok_or_else(|| JwtError::SigningFailed("token lifetime out of range".to_string()))?;

    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| JwtError::SigningFailed(e.to_string()))
}

/// Validate an access token and return the user ID it was issued to
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Uuid, JwtError> {
    validate_access_token_at(config, token, Utc::now())
}

/// Validate an access token against the clock reading `now`
pub fn validate_access_token_at(
    config: &JwtConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, JwtError> {
    let claims = decode_claims_at(config, token, now)?;
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::MalformedToken)
}

/// Verify signature, algorithm, issuer and expiry, returning the raw claims
pub fn decode_claims_at(
    config: &JwtConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Claims, JwtError> {
    check_declared_algorithm(token)?;

    let mut validation = Validation::new(ALGORITHM);
    // Expiry is checked below against the caller's clock, without leeway
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.set_issuer(&[ISSUER]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::MalformedToken,
    })?;

    if now.timestamp() >= token_data.claims.exp {
        return Err(JwtError::Expired);
    }

    Ok(token_data.claims)
}

/// Reject any header whose `alg` is not the pinned one, including values
/// such as `none` that jsonwebtoken cannot even parse.
fn check_declared_algorithm(token: &str) -> Result<(), JwtError> {
    let header_segment = token.split('.').next().ok_or(JwtError::MalformedToken)?;
    let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| JwtError::MalformedToken)?;
    let header: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| JwtError::MalformedToken)?;

    match header.get("alg").and_then(serde_json::Value::as_str) {
        Some("HS256") => Ok(()),
        Some(_) => Err(JwtError::InvalidSignature),
        None => Err(JwtError::MalformedToken),
    }
}
