pub mod app;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

// Re-export key functions for convenience
pub use app::{AppState, create_app, init_tracing};
