//! Admin handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::Html};
use std::sync::Arc;

/// File server hit count as an HTML page
#[utoipa::path(
    get,
    path = "/admin/metrics",
    tag = "admin",
    responses(
        (status = 200, description = "Metrics page", body = String, content_type = "text/html")
    )
)]
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<html>
  <body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {} times!</p>
  </body>
</html>"#,
        state.hits()
    ))
}

/// Reset the hit counter and delete every user
///
/// Only available on the `dev` platform.
#[utoipa::path(
    post,
    path = "/admin/reset",
    tag = "admin",
    responses(
        (status = 200, description = "State reset", body = String, content_type = "text/plain"),
        (status = 403, description = "Not the dev platform", body = crate::error::ApiError),
    )
)]
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    if !state.config.server.is_dev() {
        return Err(AppError::Forbidden(
            "Reset is only allowed in dev environment".to_string(),
        ));
    }

    state.reset_hits();
    let deleted = state.store.users.delete_all().await?;
    tracing::warn!(deleted, "Reset hit counter and deleted all users");

    Ok("Hits reset to 0 and database reset to initial state.".to_string())
}
