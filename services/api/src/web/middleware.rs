//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::auth::session_from_headers;
use crate::web::state::AppState;

/// Middleware that lets a request through only with a session cookie issued by the
/// access gate. Missing or unknown sessions get 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = session_from_headers(req.headers())
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !state.gate.is_valid(&session_id).await {
        debug!("Rejected request with an unknown session.");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
