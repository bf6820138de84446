use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Only PDF uploads are accepted
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Upload ceiling for the `file` field (50 MiB)
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// A file + question submission, as received by the ask route and forwarded
/// to the backend. Lives for a single request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadedFile,
    pub question: String,
    pub top_k: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MIME_TYPE
    }
}

/// Answer returned by the backend's `/ask` endpoint. A missing or null
/// `answer` decodes as empty so views can show their own fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
    #[serde(default)]
    pub context_chunks: Vec<String>,
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub document_hash: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload of the backend's `/health` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of the health route when the backend cannot be reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedHealth {
    pub status: String,
    pub error: String,
    pub backend_available: bool,
    pub timestamp: String,
}

impl DegradedHealth {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: error.into(),
            backend_available: false,
            timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Uniform error body of the proxy routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_tolerates_missing_services() {
        let status: HealthStatus =
            serde_json::from_str(r#"{"status":"healthy","timestamp":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(status.is_healthy());
        assert!(status.services.is_empty());
    }

    #[test]
    fn test_degraded_health_shape() {
        let degraded = serde_json::to_value(DegradedHealth::new("boom")).unwrap();
        assert_eq!(degraded["status"], "unhealthy");
        assert_eq!(degraded["error"], "boom");
        assert_eq!(degraded["backend_available"], false);
        let timestamp = degraded["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        // Same shape as a JS `toISOString()`: millisecond precision, `Z` suffix
        assert!(timestamp.ends_with('Z'));
        assert_eq!(timestamp.len(), "2024-05-01T12:00:00.000Z".len());
    }

    #[test]
    fn test_answer_result_tolerates_missing_answer() {
        let missing: AnswerResult = serde_json::from_str(
            r#"{"context_chunks":[],"processing_time":0.1,"document_hash":"h"}"#,
        )
        .unwrap();
        assert_eq!(missing.answer, "");
        assert_eq!(missing.document_hash, "h");

        let null: AnswerResult = serde_json::from_str(r#"{"answer":null}"#).unwrap();
        assert_eq!(null.answer, "");
        assert!(null.context_chunks.is_empty());

        let empty: AnswerResult = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.answer, "");

        assert!(serde_json::from_str::<AnswerResult>(r#"{"answer":42}"#).is_err());
    }

    #[test]
    fn test_uploaded_file_pdf_check() {
        let file = UploadedFile {
            file_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![0; 4],
        };
        assert!(!file.is_pdf());
        assert_eq!(file.size(), 4);
    }
}
