//! User account handlers

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::{AuthenticatedUser, CredentialsRequest, UserInfo};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, http::StatusCode, Extension, Json};
use std::sync::Arc;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    let user = state.auth.register(request).await?;

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: user.id,
        email: user.email.clone(),
        ip_address: extract_ip_address(&headers),
    });

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Replace the caller's email and password
#[utoipa::path(
    put,
    path = "/api/users",
    tag = "users",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "User updated", body = UserInfo),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<UserInfo>, AppError> {
    let user = state
        .auth
        .update_credentials(caller.user_id, request)
        .await?;

    audit_log(&AuditEvent::CredentialsChanged {
        user_id: user.id,
        email: user.email.clone(),
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(user.into()))
}
