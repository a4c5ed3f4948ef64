//! Payment provider webhook
//!
//! Polka calls this endpoint with `Authorization: ApiKey <key>`. Only the
//! `user.upgraded` event does anything; every other event is acknowledged.

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::AuthorizationGate;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Webhook payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolkaWebhook {
    pub event: String,
    pub data: PolkaWebhookData,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolkaWebhookData {
    pub user_id: Uuid,
}

/// Receive a payment provider event
#[utoipa::path(
    post,
    path = "/api/polka/webhooks",
    tag = "webhooks",
    request_body = PolkaWebhook,
    responses(
        (status = 204, description = "Event handled or ignored"),
        (status = 400, description = "Malformed payload or Authorization header", body = crate::error::ApiError),
        (status = 401, description = "Missing or wrong API key", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn polka_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    // The caller is checked before the payload is even parsed
    if let Err(e) = AuthorizationGate::authenticate_service_caller(&headers, state.polka_key()) {
        audit_log(&AuditEvent::WebhookRejected {
            reason: e.to_string(),
            ip_address: extract_ip_address(&headers),
        });
        return Err(e.into());
    }

    let webhook: PolkaWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    if webhook.event != USER_UPGRADED_EVENT {
        tracing::debug!(event = %webhook.event, "Ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    let user = state.store.users.upgrade_to_red(webhook.data.user_id).await?;
    audit_log(&AuditEvent::AccountUpgraded { user_id: user.id });

    Ok(StatusCode::NO_CONTENT)
}
