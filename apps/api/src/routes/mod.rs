pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::portfolio::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/file",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
