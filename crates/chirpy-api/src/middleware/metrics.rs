//! File server hit counting middleware
//!
//! Every request routed to the static file server bumps the counter shown on
//! the admin metrics page, whatever the response status.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let hits = state.record_hit();
    tracing::trace!(path = %request.uri().path(), hits, "File server hit");

    next.run(request).await
}
