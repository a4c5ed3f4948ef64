//! Security audit logging for authentication events
//!
//! Logins, token refreshes, revocations and access control failures are
//! emitted as structured events on the "audit" tracing target, so they can be
//! filtered and routed separately from application logs.
//!
//! Events never carry secrets: no passwords, no token strings, no API keys.
//!
//! # Example
//!
//! ```ignore
//! use chirpy_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: Some("Mozilla/5.0...".to_string()),
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user registration
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Email and password replaced
    CredentialsChanged {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Access token minted from a refresh token
    TokenRefresh {
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh token revoked
    RefreshTokenRevoked {
        user_id: Uuid,
        ip_address: Option<String>,
    },

    /// Invalid, expired or unknown token presented
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Authenticated caller denied access to another user's resource
    AccessDenied {
        user_id: Uuid,
        resource: String,
        ip_address: Option<String>,
    },

    /// Service webhook call with a bad or missing API key
    WebhookRejected {
        reason: String,
        ip_address: Option<String>,
    },

    /// Account upgraded by the payment provider
    AccountUpgraded { user_id: Uuid },
}

impl AuditEvent {
    /// Stable name of the event, as serialized in `event_type`
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "login_success",
            AuditEvent::LoginFailure { .. } => "login_failure",
            AuditEvent::RegistrationSuccess { .. } => "registration_success",
            AuditEvent::CredentialsChanged { .. } => "credentials_changed",
            AuditEvent::TokenRefresh { .. } => "token_refresh",
            AuditEvent::RefreshTokenRevoked { .. } => "refresh_token_revoked",
            AuditEvent::InvalidToken { .. } => "invalid_token",
            AuditEvent::AccessDenied { .. } => "access_denied",
            AuditEvent::WebhookRejected { .. } => "webhook_rejected",
            AuditEvent::AccountUpgraded { .. } => "account_upgraded",
        }
    }

    /// Failures are logged at WARN, everything else at INFO
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AuditEvent::LoginFailure { .. }
                | AuditEvent::InvalidToken { .. }
                | AuditEvent::AccessDenied { .. }
                | AuditEvent::WebhookRejected { .. }
        )
    }

    fn message(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "User registered",
            AuditEvent::CredentialsChanged { .. } => "Credentials changed",
            AuditEvent::TokenRefresh { .. } => "Access token refreshed",
            AuditEvent::RefreshTokenRevoked { .. } => "Refresh token revoked",
            AuditEvent::InvalidToken { .. } => "Invalid token presented",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::WebhookRejected { .. } => "Webhook caller rejected",
            AuditEvent::AccountUpgraded { .. } => "Account upgraded",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event is serialized to JSON for log aggregators. Example output:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "user@example.com",
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    if event.is_failure() {
        warn!(
            target: "audit",
            timestamp = %timestamp,
            event_type = event.event_type(),
            event = %event_json,
            "{}",
            event.message()
        );
    } else {
        info!(
            target: "audit",
            timestamp = %timestamp,
            event_type = event.event_type(),
            event = %event_json,
            "{}",
            event.message()
        );
    }
}

/// Extract client IP address from request headers
///
/// Checks `X-Forwarded-For` first (taking the client end of the chain),
/// then `X-Real-IP`.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
