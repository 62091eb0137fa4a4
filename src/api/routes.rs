use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        // Health check
        .route("/ping", get(handlers::ping))
        // Scoring
        .route("/invocations", post(handlers::invocations))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
