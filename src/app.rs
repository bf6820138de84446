use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::routes::create_routes;

/// State shared by the proxy handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: BackendClient,
}

impl AppState {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(BackendClient::new(config.backend_url.as_str()))
    }
}

/// Initialize tracing and logging for the application
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Create and configure the Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    info!(
        "Initializing application router, backend at {}",
        state.backend.base_url()
    );

    Router::new()
        .merge(create_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
