//! Authentication and authorization module
//!
//! The identity core:
//! - Password hashing with Argon2id
//! - Access token (JWT) issuance and validation
//! - Opaque refresh tokens with revocation
//! - `Authorization` header extraction
//! - The authorization gate and its axum middleware
//! - Authentication service tying them to storage

pub mod bearer;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod service;

pub use bearer::{extract_api_key, extract_bearer, HeaderError};
pub use gate::{constant_time_eq, AuthError, AuthorizationGate};
pub use jwt::{generate_access_token, validate_access_token, Claims, JwtConfig, JwtError};
pub use middleware::{require_user, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use refresh::{generate_refresh_token, RefreshError, RefreshTokenStore};
pub use service::{
    AuthResponse, AuthService, CredentialsRequest, Session, TokenResponse, UserInfo,
};
