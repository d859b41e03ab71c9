pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/interviews/:session_id/next",
            post(handlers::handle_next_question),
        )
        .route(
            "/api/v1/interviews/:session_id/summary",
            get(handlers::handle_get_summary),
        )
        .route(
            "/api/v1/interviews/:session_id/transcript",
            get(handlers::handle_get_transcript),
        )
        .with_state(state)
}
