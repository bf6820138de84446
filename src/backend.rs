use reqwest::{
    StatusCode,
    header::{CACHE_CONTROL, CONTENT_TYPE},
    multipart::{Form, Part},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::UploadRequest;

const FALLBACK_BACKEND_MESSAGE: &str = "Backend request failed";

#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-success answer from `/ask`, with the message taken from its body
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("Backend health check failed: {0}")]
    HealthCheck(u16),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Decode(String),
}

/// Client for the external question-answering backend.
///
/// Every call is a single attempt with no timeout: a backend that never
/// answers keeps the proxied request open.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward an upload to `POST {backend}/ask` and return the backend's JSON
    /// body untouched.
    pub async fn ask(&self, request: UploadRequest) -> Result<Value, BackendError> {
        let url = format!("{}/ask", self.base_url);
        info!(
            "Forwarding '{}' ({} bytes) to {}",
            request.file.file_name,
            request.file.size(),
            url
        );

        let response = self
            .http
            .post(&url)
            .multipart(upload_form(request)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let payload: Value =
            serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                message: failure_message(&payload),
            });
        }

        debug!("Backend answered /ask with {}", status);
        Ok(payload)
    }

    /// Check `GET {backend}/health`, bypassing any caches on the way.
    pub async fn health(&self) -> Result<Value, BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::HealthCheck(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Re-encode the validated fields as a fresh multipart body. `top_k` is only
/// sent when the caller supplied a non-empty value.
fn upload_form(request: UploadRequest) -> Result<Form, BackendError> {
    let file = Part::bytes(request.file.bytes)
        .file_name(request.file.file_name)
        .mime_str(&request.file.content_type)?;

    let mut form = Form::new()
        .part("file", file)
        .text("question", request.question);

    if let Some(top_k) = request.top_k.filter(|value| !value.is_empty()) {
        form = form.text("top_k", top_k);
    }

    Ok(form)
}

fn failure_message(payload: &Value) -> String {
    match payload.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Null) | None => FALLBACK_BACKEND_MESSAGE.to_string(),
        Some(Value::String(_)) => FALLBACK_BACKEND_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    }
}
