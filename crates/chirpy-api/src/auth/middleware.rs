/// Authentication middleware for protecting routes
///
/// Runs the authorization gate over the `Authorization` header. On success
/// the caller's identity is added to request extensions; on failure the
/// request never reaches the handler.
use super::gate::AuthError;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, extracted in handlers with `Extension<AuthenticatedUser>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Middleware that requires a valid access token
///
/// # Usage
///
/// ```ignore
/// let protected = Router::new()
///     .route("/api/chirps", post(create_chirp_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_user));
/// ```
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = match state.gate.authenticate(request.headers()) {
        Ok(user_id) => user_id,
        Err(e) => {
            if let AuthError::Token(reason) = &e {
                audit_log(&AuditEvent::InvalidToken {
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                    reason: reason.to_string(),
                });
            }
            return Err(e.into());
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
