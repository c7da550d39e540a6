pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::controller::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Story session
        .route(
            "/api/v1/story",
            get(handlers::handle_get_story).post(handlers::handle_submit_story),
        )
        .route("/api/v1/story/reset", post(handlers::handle_reset_story))
        .route("/api/v1/story/events", get(handlers::handle_story_events))
        // Illustrations
        .route(
            "/api/v1/story/illustrations",
            post(handlers::handle_generate_illustrations),
        )
        .route(
            "/api/v1/story/illustrations/:slot",
            get(handlers::handle_get_illustration).post(handlers::handle_generate_illustration),
        )
        // Reading view and export
        .route("/api/v1/story/layout", get(handlers::handle_get_layout))
        .route("/api/v1/story/export", get(handlers::handle_export_story))
        .layer(upload_limit)
        .with_state(state)
}
