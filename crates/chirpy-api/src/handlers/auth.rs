//! Authentication handlers
//!
//! Login issues an access token and a refresh token. The refresh and revoke
//! endpoints take the refresh token as a `Bearer` credential.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::bearer::bearer_from_headers;
use crate::auth::{AuthError, AuthResponse, CredentialsRequest, RefreshError, TokenResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Incorrect email or password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);
    let email = request.email.clone();

    match state.auth.login(request).await {
        Ok(session) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: session.user.id,
                email,
                ip_address,
                user_agent,
            });
            Ok(Json(session.into()))
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: e.to_string(),
                    ip_address,
                    user_agent,
                });
            }
            Err(e.into())
        }
    }
}

/// Exchange a refresh token for a new access token
///
/// The refresh token stays valid; it is not rotated.
#[utoipa::path(
    post,
    path = "/api/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 400, description = "Missing or malformed Authorization header", body = crate::error::ApiError),
        (status = 401, description = "Unknown, revoked or expired refresh token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let refresh_token = refresh_token_from(&headers)?;

    match state.auth.refresh(refresh_token).await {
        Ok((user_id, token)) => {
            audit_log(&AuditEvent::TokenRefresh {
                user_id,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(TokenResponse { token }))
        }
        Err(e) => {
            reject_refresh_token(&headers, &e);
            Err(e.into())
        }
    }
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/api/revoke",
    tag = "auth",
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 400, description = "Missing or malformed Authorization header", body = crate::error::ApiError),
        (status = 401, description = "Unknown refresh token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let refresh_token = refresh_token_from(&headers)?;

    match state.auth.revoke(refresh_token).await {
        Ok(user_id) => {
            audit_log(&AuditEvent::RefreshTokenRevoked {
                user_id,
                ip_address: extract_ip_address(&headers),
            });
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            reject_refresh_token(&headers, &e);
            Err(e.into())
        }
    }
}

// The refresh token is the request's only input, so any header problem is bad input
fn refresh_token_from(headers: &HeaderMap) -> Result<&str, AppError> {
    bearer_from_headers(headers).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn reject_refresh_token(headers: &HeaderMap, error: &AuthError) {
    if let AuthError::Refresh(
        reason @ (RefreshError::NotFound | RefreshError::Revoked | RefreshError::Expired),
    ) = error
    {
        audit_log(&AuditEvent::InvalidToken {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
            reason: reason.to_string(),
        });
    }
}
