use authdiag::FetchError;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

/// Errors that prevent the application state from being built
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid URL in configuration: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] FetchError),

    #[error("Failed to create proxy client: {0}")]
    ProxyClient(#[from] reqwest::Error),
}
