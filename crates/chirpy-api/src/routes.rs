//! API route definitions

use crate::auth::require_user;
use crate::handlers::{admin, auth, chirps, health, users, webhooks};
use crate::middleware::metrics_middleware;
use crate::openapi::openapi_json;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api_routes(state.clone()))
        .merge(admin_routes())
        .merge(file_server_routes(state.clone()))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/healthz", get(health::healthz))
        .route("/api/users", post(users::create_user_handler))
        .route("/api/login", post(auth::login_handler))
        // Refresh tokens are checked by the handlers, not by the access token gate
        .route("/api/refresh", post(auth::refresh_handler))
        .route("/api/revoke", post(auth::revoke_handler))
        .route("/api/validate_chirp", post(chirps::validate_chirp_handler))
        .route("/api/chirps", get(chirps::list_chirps_handler))
        .route("/api/chirps/:id", get(chirps::get_chirp_handler))
        .route("/api/polka/webhooks", post(webhooks::polka_webhook_handler));

    // Protected routes (access token required)
    let protected_routes = Router::new()
        .route("/api/users", put(users::update_user_handler))
        .route("/api/chirps", post(chirps::create_chirp_handler))
        .route("/api/chirps/:id", delete(chirps::delete_chirp_handler))
        .route_layer(middleware::from_fn_with_state(state, require_user));

    Router::new().merge(public_routes).merge(protected_routes)
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/metrics", get(admin::metrics_handler))
        .route("/admin/reset", post(admin::reset_handler))
}

/// Static files under `/app`, each request counted
fn file_server_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let root = state.config.server.file_root.clone();

    Router::new()
        .nest_service("/app", ServeDir::new(root))
        .layer(middleware::from_fn_with_state(state, metrics_middleware))
}
