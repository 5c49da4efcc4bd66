use crate::models::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;

/// Failures surfaced to clients of the bridge. Each one renders as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("timed out after {}s waiting for Ollama", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("could not reach Ollama: {0}")]
    Transport(String),

    #[error("Ollama returned status {0}")]
    BackendStatus(StatusCode),

    #[error("invalid response from Ollama: {0}")]
    InvalidBackendBody(String),

    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
