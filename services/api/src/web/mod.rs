pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;

/// Attached reference documents travel base64-encoded inside the JSON body.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Builds the API router: the login endpoints are public, everything else sits
/// behind the access gate.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route("/status", get(rest::status_handler))
        .route("/form-options", get(rest::form_options_handler))
        .route("/generations", post(rest::create_generation_handler))
        .route("/generations/current", get(rest::current_generation_handler))
        .route("/images", post(rest::generate_image_handler))
        .route("/history", get(rest::list_history_handler))
        .route(
            "/history/{id}",
            get(rest::get_history_handler).delete(rest::delete_history_handler),
        )
        .route("/history/{id}/load", post(rest::load_history_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}
