use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{DegradedHealth, MAX_UPLOAD_BYTES, UploadRequest, UploadedFile};
use axum::{
    extract::{
        Multipart, State,
        multipart::{Field, MultipartRejection},
    },
    http::{StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Ask handler: validates a PDF + question upload and relays it to the
/// backend's `/ask` endpoint.
pub async fn ask_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<ResponseJson<Value>> {
    let multipart = multipart.map_err(|e| AppError::InternalServerError(e.body_text()))?;
    let upload = read_upload(multipart).await?;
    let request = upload.validate()?;

    info!(
        "Ask endpoint called for '{}' with question: {}",
        request.file.file_name, request.question
    );

    let answer = state.backend.ask(request).await?;

    info!("Successfully relayed backend answer");
    Ok(ResponseJson(answer))
}

/// Health handler: relays the backend's health payload, or a degraded body
/// with 503 when the backend cannot be reached.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    debug!("Health endpoint called");

    match state.backend.health().await {
        Ok(payload) => ([(CACHE_CONTROL, "no-store")], ResponseJson(payload)).into_response(),
        Err(e) => {
            error!("Health check error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(CACHE_CONTROL, "no-store")],
                ResponseJson(DegradedHealth::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Raw multipart fields before validation
#[derive(Debug, Default)]
struct UploadFields {
    file: Option<ReceivedFile>,
    question: Option<String>,
    top_k: Option<String>,
}

#[derive(Debug)]
struct ReceivedFile {
    file: UploadedFile,
    /// Bytes seen on the wire; past the ceiling nothing more is buffered
    size: usize,
}

impl UploadFields {
    /// Checks run in order: required fields, content type, size.
    fn validate(self) -> AppResult<UploadRequest> {
        let (Some(received), Some(question)) = (self.file, self.question) else {
            warn!("Rejected upload: missing file or question");
            return Err(AppError::BadRequest(
                "Both file and question are required".to_string(),
            ));
        };
        if question.trim().is_empty() {
            warn!("Rejected upload: empty question");
            return Err(AppError::BadRequest(
                "Both file and question are required".to_string(),
            ));
        }

        if !received.file.is_pdf() {
            warn!(
                "Rejected upload '{}': content type {:?}",
                received.file.file_name, received.file.content_type
            );
            return Err(AppError::BadRequest(
                "Only PDF files are supported".to_string(),
            ));
        }

        if received.size > MAX_UPLOAD_BYTES {
            warn!(
                "Rejected upload '{}': {} bytes",
                received.file.file_name, received.size
            );
            return Err(AppError::PayloadTooLarge(
                "File size exceeds 50MB limit".to_string(),
            ));
        }

        Ok(UploadRequest {
            file: received.file,
            question,
            top_k: self.top_k,
        })
    }
}

async fn read_upload(mut multipart: Multipart) -> AppResult<UploadFields> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to read form data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        // First occurrence of a field wins
        match field_name.as_str() {
            "file" if fields.file.is_none() => {
                fields.file = Some(read_file(field).await?);
            }
            "question" if fields.question.is_none() => {
                fields.question = Some(read_text(field).await?);
            }
            "top_k" if fields.top_k.is_none() => {
                fields.top_k = Some(read_text(field).await?);
            }
            _ => debug!("Ignoring multipart field {:?}", field_name),
        }
    }

    Ok(fields)
}

async fn read_file(mut field: Field<'_>) -> AppResult<ReceivedFile> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or("").to_string();

    let mut bytes = Vec::new();
    let mut size = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to read file: {}", e)))?
    {
        size += chunk.len();
        if size <= MAX_UPLOAD_BYTES {
            bytes.extend_from_slice(&chunk);
        } else if !bytes.is_empty() {
            bytes = Vec::new();
        }
    }

    Ok(ReceivedFile {
        file: UploadedFile {
            file_name,
            content_type,
            bytes,
        },
        size,
    })
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to read form field: {}", e)))
}
