//! Calls to the Ollama server.
//!
//! [`Backend`] owns the HTTP client, the base URL and both timeouts. Every call it makes is bounded
//! by a timeout that covers connecting, the response head and reading the full body.
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::models::TagsResponse;
use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, Uri, header},
};
use std::time::Duration;
use tracing::debug;
use url::Url;

const TAGS_PATH: &str = "/api/tags";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Result of a health probe. Probing never fails: an unreachable backend is simply unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStatus {
    pub available: bool,
    pub models: Vec<String>,
}

/// A fully read backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Backend<T: HttpClient> {
    client: T,
    base_url: Url,
    probe_timeout: Duration,
    chat_timeout: Duration,
}

impl<T: HttpClient> Backend<T> {
    pub fn new(client: T, base_url: Url, probe_timeout: Duration, chat_timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            probe_timeout,
            chat_timeout,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Probes `/api/tags`, swallowing every failure.
    pub async fn check(&self) -> BackendStatus {
        match self.probe().await {
            Ok(tags) => BackendStatus {
                available: true,
                models: tags.names(),
            },
            Err(e) => {
                debug!("Ollama probe failed: {}", e);
                BackendStatus::default()
            }
        }
    }

    async fn probe(&self) -> Result<TagsResponse, RelayError> {
        let response = self.fetch_tags().await?;
        if !response.status.is_success() {
            return Err(RelayError::BackendStatus(response.status));
        }
        parse_tags(&response.body)
    }

    /// Fetches Ollama's native model listing. Any status is returned as-is.
    pub async fn fetch_tags(&self) -> Result<BackendResponse, RelayError> {
        let uri = endpoint(&self.base_url, TAGS_PATH)?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        self.send(req, self.probe_timeout).await
    }

    /// Forwards a chat completion body verbatim. Any status is returned as-is.
    pub async fn chat_completions(&self, body: Bytes) -> Result<BackendResponse, RelayError> {
        let uri = endpoint(&self.base_url, CHAT_COMPLETIONS_PATH)?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        self.send(req, self.chat_timeout).await
    }

    async fn send(
        &self,
        req: axum::extract::Request,
        timeout: Duration,
    ) -> Result<BackendResponse, RelayError> {
        tokio::time::timeout(timeout, self.exchange(req))
            .await
            .map_err(|_| RelayError::Timeout(timeout))?
    }

    async fn exchange(&self, req: axum::extract::Request) -> Result<BackendResponse, RelayError> {
        let response = self
            .client
            .request(req)
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(BackendResponse { status, body })
    }
}

/// Parses an `/api/tags` body.
pub fn parse_tags(body: &[u8]) -> Result<TagsResponse, RelayError> {
    serde_json::from_slice(body).map_err(|e| RelayError::InvalidBackendBody(e.to_string()))
}

/// Joins `path` onto the backend base URL, keeping any path prefix the base URL carries.
pub fn endpoint(base_url: &Url, path: &str) -> Result<Uri, RelayError> {
    let mut url = base_url.clone();

    let base_path = url.path().trim_end_matches('/');
    let full_path = format!("{}/{}", base_path, path.trim_start_matches('/'));
    url.set_path(&full_path);
    url.set_query(None);

    Uri::try_from(url.as_str()).map_err(|e| RelayError::InvalidUrl(e.to_string()))
}
