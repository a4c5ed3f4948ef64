//! Chirp handlers
//!
//! Reading is public. Posting needs an access token, and deleting further
//! requires the caller to be the chirp's author.

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::{AuthenticatedUser, AuthorizationGate};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chirpy_core::{validate_chirp_body, Chirp, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Chirp body submitted for posting or validation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChirpRequest {
    pub body: String,
}

/// Result of validating a chirp without posting it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateChirpResponse {
    pub cleaned_body: String,
}

/// Chirp response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChirpResponse {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Chirp> for ChirpResponse {
    fn from(chirp: Chirp) -> Self {
        Self {
            id: chirp.id,
            body: chirp.body,
            user_id: chirp.user_id,
            created_at: chirp.created_at,
            updated_at: chirp.updated_at,
        }
    }
}

/// Chirp listing filters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListChirpsQuery {
    /// Only chirps by this author
    pub author_id: Option<Uuid>,
    /// `asc` (default) or `desc` by creation time
    pub sort: Option<String>,
}

/// Check length and redact profanity
#[utoipa::path(
    post,
    path = "/api/validate_chirp",
    tag = "chirps",
    request_body = ChirpRequest,
    responses(
        (status = 200, description = "Chirp is valid", body = ValidateChirpResponse),
        (status = 400, description = "Chirp is too long", body = crate::error::ApiError),
    )
)]
pub async fn validate_chirp_handler(
    Json(request): Json<ChirpRequest>,
) -> Result<Json<ValidateChirpResponse>, AppError> {
    let cleaned_body = validate_chirp_body(&request.body)?;
    Ok(Json(ValidateChirpResponse { cleaned_body }))
}

/// Post a chirp as the authenticated user
#[utoipa::path(
    post,
    path = "/api/chirps",
    tag = "chirps",
    request_body = ChirpRequest,
    responses(
        (status = 201, description = "Chirp created", body = ChirpResponse),
        (status = 400, description = "Chirp is too long", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_chirp_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(request): Json<ChirpRequest>,
) -> Result<(StatusCode, Json<ChirpResponse>), AppError> {
    let body = validate_chirp_body(&request.body)?;
    let chirp = state
        .store
        .chirps
        .create_chirp(Chirp::new(caller.user_id, body))
        .await?;

    tracing::debug!(chirp_id = %chirp.id, user_id = %caller.user_id, "Created chirp");
    Ok((StatusCode::CREATED, Json(chirp.into())))
}

/// List chirps
#[utoipa::path(
    get,
    path = "/api/chirps",
    tag = "chirps",
    params(ListChirpsQuery),
    responses(
        (status = 200, description = "Chirps by creation time", body = Vec<ChirpResponse>),
        (status = 400, description = "Invalid sort order", body = crate::error::ApiError),
    )
)]
pub async fn list_chirps_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListChirpsQuery>,
) -> Result<Json<Vec<ChirpResponse>>, AppError> {
    let sort = match query.sort.as_deref() {
        Some(value) => value.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };

    let chirps = state.store.chirps.list_chirps(query.author_id, sort).await?;
    Ok(Json(chirps.into_iter().map(ChirpResponse::from).collect()))
}

/// Get a chirp by ID
#[utoipa::path(
    get,
    path = "/api/chirps/{id}",
    tag = "chirps",
    params(("id" = Uuid, Path, description = "Chirp ID")),
    responses(
        (status = 200, description = "Chirp found", body = ChirpResponse),
        (status = 400, description = "Invalid chirp ID", body = crate::error::ApiError),
        (status = 404, description = "Chirp not found", body = crate::error::ApiError),
    )
)]
pub async fn get_chirp_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChirpResponse>, AppError> {
    let id = parse_chirp_id(&id)?;
    let chirp = state
        .store
        .chirps
        .get_chirp(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp".to_string()))?;

    Ok(Json(chirp.into()))
}

/// Delete one of the caller's own chirps
#[utoipa::path(
    delete,
    path = "/api/chirps/{id}",
    tag = "chirps",
    params(("id" = Uuid, Path, description = "Chirp ID")),
    responses(
        (status = 204, description = "Chirp deleted"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not the author", body = crate::error::ApiError),
        (status = 404, description = "Chirp not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_chirp_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_chirp_id(&id)?;
    let chirp = state
        .store
        .chirps
        .get_chirp(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp".to_string()))?;

    if let Err(e) = AuthorizationGate::authorize_ownership(caller.user_id, chirp.user_id) {
        audit_log(&AuditEvent::AccessDenied {
            user_id: caller.user_id,
            resource: format!("chirp:{id}"),
            ip_address: extract_ip_address(&headers),
        });
        return Err(e.into());
    }

    if !state.store.chirps.delete_chirp(id).await? {
        return Err(AppError::NotFound("Chirp".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn parse_chirp_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::BadRequest("Invalid chirp ID".to_string()))
}
