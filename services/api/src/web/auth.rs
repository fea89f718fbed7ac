//! services/api/src/web/auth.rs
//!
//! The shared access-code gate and its login/logout endpoints.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Access Gate
//=========================================================================================

/// One shared passphrase, compared as-is. Sessions live in memory and do not expire.
pub struct AccessGate {
    access_code: String,
    sessions: RwLock<HashSet<String>>,
}

impl AccessGate {
    pub fn new(access_code: impl Into<String>) -> Self {
        Self {
            access_code: access_code.into(),
            sessions: RwLock::new(HashSet::new()),
        }
    }

    /// Returns a new session id when `code` matches the access code.
    pub async fn login(&self, code: &str) -> Option<String> {
        if code != self.access_code {
            return None;
        }
        let session_id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(session_id.clone());
        Some(session_id)
    }

    pub async fn is_valid(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains(session_id)
    }

    pub async fn logout(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id)
    }
}

/// Reads the session id from the `Cookie` header.
pub fn session_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}

fn session_cookie(session_id: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, session_id
    )
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub access_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub authenticated: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Unlock the portal with the shared access code
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access granted", body = LoginResponse),
        (status = 401, description = "Incorrect access code")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(session_id) = state.gate.login(&req.access_code).await else {
        warn!("Rejected login with an incorrect access code.");
        return Err((StatusCode::UNAUTHORIZED, "Incorrect access code.".to_string()));
    };

    info!("Portal unlocked.");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Json(LoginResponse {
            authenticated: true,
        }),
    ))
}

/// POST /auth/logout - Forget the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_id = session_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    if !state.gate.logout(session_id).await {
        return Err((StatusCode::UNAUTHORIZED, "No session found".to_string()));
    }

    let cookie = "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}
