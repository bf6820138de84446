use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::models::{AnswerResult, HealthStatus};

const FALLBACK_ASK_MESSAGE: &str = "Failed to get answer";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The proxy answered with its `{error}` envelope
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from server: {0}")]
    Decode(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A local PDF picked by the user, held in memory until it is submitted
#[derive(Clone, PartialEq)]
pub struct PdfUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    /// Type and size are left for the proxy to judge.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for PdfUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The two proxy operations the views depend on
#[async_trait]
pub trait QaApi: Send + Sync {
    async fn ask(
        &self,
        upload: &PdfUpload,
        question: &str,
        top_k: Option<u32>,
    ) -> Result<AnswerResult, ClientError>;

    async fn health(&self) -> Result<HealthStatus, ClientError>;
}

#[async_trait]
impl<T: QaApi + ?Sized> QaApi for Arc<T> {
    async fn ask(
        &self,
        upload: &PdfUpload,
        question: &str,
        top_k: Option<u32>,
    ) -> Result<AnswerResult, ClientError> {
        (**self).ask(upload, question, top_k).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        (**self).health().await
    }
}

/// HTTP client for the proxy's `/api/ask` and `/api/health` routes
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl QaApi for ApiClient {
    async fn ask(
        &self,
        upload: &PdfUpload,
        question: &str,
        top_k: Option<u32>,
    ) -> Result<AnswerResult, ClientError> {
        let file = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let mut form = Form::new()
            .part("file", file)
            .text("question", question.to_string());
        if let Some(top_k) = top_k {
            form = form.text("top_k", top_k.to_string());
        }

        let response = self
            .http
            .post(format!("{}/api/ask", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|payload| payload.get("error")?.as_str().map(str::to_string))
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| FALLBACK_ASK_MESSAGE.to_string());
            debug!("Ask failed with {}: {}", status, message);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: "Backend unavailable".to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
