//! JSON bodies exchanged with the generation service

use crate::types::{DatasetRecord, PreviewRecord, RemoteStatus};
use serde::Deserialize;

/// `POST /generate/`
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// `GET /status`
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: RemoteStatus,
    // The backend sends integers, but a float must not break polling
    pub progress: f64,
}

/// `GET /preview`
#[derive(Debug, Deserialize)]
pub(crate) struct PreviewResponse {
    pub preview: Option<Vec<PreviewRecord>>,
}

/// `GET /queries/user`
#[derive(Debug, Deserialize)]
pub(crate) struct QueriesResponse {
    #[serde(default)]
    pub datasets: Vec<DatasetRecord>,
}

/// `POST /auth/login`
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Error body: `{"detail": ...}` from the auth routes and validation, `{"error": ...}`
/// from the generation route
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        match self.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => self.error,
            Some(other) => Some(other.to_string()),
        }
    }
}
