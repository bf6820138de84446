use anyhow::{Context, Result};
use reqwest::Url;
use std::env;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend_url: Url,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: port
                .parse()
                .with_context(|| format!("PORT must be a valid number, got {port:?}"))?,
            backend_url: Url::parse(&backend_url)
                .with_context(|| format!("BACKEND_URL is not a valid URL: {backend_url:?}"))?,
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "pdf_qa_svc=info,tower_http=debug".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
