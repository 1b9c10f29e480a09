// Transcription service client
pub mod http;
pub mod multipart;

pub use http::HttpTranscriptionApi;

use crate::models::{FormOptions, ResultFormat, ResultPayload, StatusResponse};
use crate::selection::StagedFile;
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, DNS failure, reset, etc.
    Transport(String),
    /// Non-2xx response, with the `detail` field of the body when present
    Server { status: u16, detail: Option<String> },
    /// 2xx response whose body could not be decoded
    Decode(String),
}

impl ApiError {
    /// Server-provided detail if any, otherwise a description of the failure
    pub fn detail(&self) -> String {
        match self {
            ApiError::Transport(message) | ApiError::Decode(message) => message.clone(),
            ApiError::Server { status, detail } => detail
                .clone()
                .unwrap_or_else(|| format!("Server error {}", status)),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(message) => write!(f, "Network error: {}", message),
            ApiError::Server { status, detail: Some(detail) } => {
                write!(f, "Server error {}: {}", status, detail)
            }
            ApiError::Server { status, detail: None } => write!(f, "Server error {}", status),
            ApiError::Decode(message) => write!(f, "Invalid response: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Pull the `detail` message out of an error body. FastAPI validation errors
/// carry a list there, which is flattened to its `msg` fields.
pub fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(serde_json::Value::Array(items)) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()).map(String::from))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            Some(other) => Some(other.to_string()),
            None => None,
        },
        Err(_) => Some(trimmed.to_string()),
    }
}

/// The remote transcription service as seen by the poller
pub trait TranscriptionApi: Send + Sync + 'static {
    /// `POST /upload`, returns the server-assigned job id
    fn upload(
        &self,
        file: &StagedFile,
        options: &FormOptions,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// `GET /status/{job_id}`
    fn status(&self, job_id: &str) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send;

    /// `GET /result/{job_id}?format=json`
    fn result(&self, job_id: &str) -> impl Future<Output = Result<ResultPayload, ApiError>> + Send;

    /// `GET /result/{job_id}?format=pdf|musicxml`, raw document bytes
    fn document(
        &self,
        job_id: &str,
        format: ResultFormat,
    ) -> impl Future<Output = Result<Vec<u8>, ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail_string() {
        let body = r#"{"detail": "Original audio file no longer exists: riff.mp3"}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("Original audio file no longer exists: riff.mp3")
        );
    }

    #[test]
    fn test_extract_detail_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "file"], "msg": "field required"}]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required"));
    }

    #[test]
    fn test_extract_detail_fallbacks() {
        assert_eq!(extract_detail(""), None);
        assert_eq!(extract_detail(r#"{"message": "x"}"#), None);
        assert_eq!(extract_detail("Bad Gateway").as_deref(), Some("Bad Gateway"));
    }

    #[test]
    fn test_api_error_detail() {
        let err = ApiError::Server { status: 502, detail: None };
        assert_eq!(err.detail(), "Server error 502");
        let err = ApiError::Server { status: 400, detail: Some("Invalid file type".to_string()) };
        assert_eq!(err.detail(), "Invalid file type");
        assert_eq!(err.to_string(), "Server error 400: Invalid file type");
    }
}
