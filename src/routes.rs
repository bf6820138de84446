use crate::app::AppState;
use crate::handlers::{ask_handler, health_handler};
use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};

/// Creates and configures all application routes
pub fn create_routes() -> Router<AppState> {
    Router::new()
        // The 50 MiB ceiling is enforced by the handler while streaming
        .route(
            "/api/ask",
            post(ask_handler).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/health", get(health_handler))
}
