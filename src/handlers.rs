/// Axum handlers for the bridge
use crate::AppState;
use crate::backend::parse_tags;
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::models::{
    BACKEND_NAME, ErrorResponse, HealthResponse, ListModelResponse, completion_content, preview,
    requested_model,
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bridge health, including a fresh probe of Ollama. Always 200.
#[instrument(skip(state))]
pub async fn health<T: HttpClient>(State(state): State<AppState<T>>) -> Json<HealthResponse> {
    let status = state.backend.check().await;
    Json(HealthResponse {
        status: "ok".into(),
        backend_available: status.available,
        ollama: status.available,
        models: status.models,
        version: VERSION.into(),
    })
}

/// Plain text liveness check; 503 while Ollama is unreachable.
#[instrument(skip(state))]
pub async fn root<T: HttpClient>(State(state): State<AppState<T>>) -> (StatusCode, &'static str) {
    if state.backend.check().await.available {
        (StatusCode::OK, "Kaede Bridge is running - Ollama connected")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Kaede Bridge is running - Ollama disconnected",
        )
    }
}

/// Passes Ollama's native `/api/tags` listing through.
#[instrument(skip(state))]
pub async fn tags<T: HttpClient>(
    State(state): State<AppState<T>>,
) -> Result<Json<Value>, RelayError> {
    let response = state.backend.fetch_tags().await.inspect_err(|e| {
        error!("Error fetching tags from {}: {}", state.backend.base_url(), e);
    })?;
    if !response.status.is_success() {
        warn!("Ollama answered /api/tags with {}", response.status);
        return Err(RelayError::BackendStatus(response.status));
    }
    let listing = serde_json::from_slice(&response.body)
        .map_err(|e| RelayError::InvalidBackendBody(e.to_string()))?;
    Ok(Json(listing))
}

/// Ollama's model listing in the shape of OpenAI's `/v1/models`.
#[instrument(skip(state))]
pub async fn models<T: HttpClient>(
    State(state): State<AppState<T>>,
) -> Result<Json<ListModelResponse>, RelayError> {
    let response = state.backend.fetch_tags().await.inspect_err(|e| {
        error!("Error fetching models from {}: {}", state.backend.base_url(), e);
    })?;
    if !response.status.is_success() {
        warn!("Ollama answered /api/tags with {}", response.status);
        return Err(RelayError::BackendStatus(response.status));
    }
    let tags = parse_tags(&response.body)?;
    Ok(Json(ListModelResponse::from(&tags)))
}

/// Forwards an OpenAI-style chat completion to Ollama and relays the answer unchanged.
#[instrument(skip(state, body))]
pub async fn chat_completions<T: HttpClient>(
    State(state): State<AppState<T>>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request: Value = serde_json::from_slice(&body).map_err(|e| {
        error!("Rejecting chat request with invalid JSON: {}", e);
        RelayError::InvalidRequest(e.to_string())
    })?;
    if !request.is_object() {
        error!("Rejecting chat request whose body is not a JSON object");
        return Err(RelayError::InvalidRequest("expected a JSON object".into()));
    }

    let model = requested_model(&request).unwrap_or(state.config.model.as_str());
    info!("Chat request for model: {}", model);

    let response = state.backend.chat_completions(body).await.inspect_err(|e| match e {
        RelayError::Timeout(_) => error!("Timed out waiting for chat completion: {}", e),
        _ => error!("Error forwarding chat request: {}", e),
    })?;

    if !response.status.is_success() {
        error!("Ollama answered chat request with {}", response.status);
        let body = ErrorResponse {
            error: format!("{BACKEND_NAME} error"),
        };
        return Ok((response.status, Json(body)).into_response());
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(completion) => info!("Chat response: {}", preview(completion_content(&completion))),
        Err(e) => warn!("Chat response is not valid JSON, relaying as-is: {}", e),
    }

    Ok(Response::builder()
        .status(response.status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
