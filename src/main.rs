use pdf_qa_svc::app::{AppState, create_app, init_tracing};
use pdf_qa_svc::config::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    info!("Starting PDF Q&A proxy...");
    info!("Configuration loaded: {:?}", config);

    // Create the application
    let app = create_app(AppState::from_config(&config));

    // Create TCP listener
    let listener = match tokio::net::TcpListener::bind(&config.bind_address()).await {
        Ok(listener) => {
            info!("Server running on {}", config.server_url());
            info!("Health check: GET /api/health");
            info!("Ask endpoint: POST /api/ask");
            listener
        }
        Err(e) => {
            error!("Failed to bind to {}: {}", config.bind_address(), e);
            std::process::exit(1);
        }
    };

    // Start the server
    info!("Server starting...");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    } else {
        info!("Server shutdown gracefully");
    }
}
