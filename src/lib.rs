//! Kaede Bridge - a local relay between web clients and an Ollama server
//!
//! The bridge exposes a handful of endpoints: health and liveness checks that probe Ollama on
//! every call, a passthrough of Ollama's native model listing, the same listing reshaped as an
//! OpenAI `/v1/models` response, and an OpenAI-style chat completions endpoint forwarded to
//! Ollama's compatibility API.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument};

pub mod backend;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod status;

use backend::Backend;
use client::{HttpClient, HyperClient};
use config::Config;

/// State shared by every handler: the immutable configuration and the backend it points at.
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub config: Arc<Config>,
    pub backend: Backend<T>,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(config: Config) -> Self {
        let http_client = client::create_hyper_client(
            config.pool_max_idle_per_host,
            config.pool_idle_timeout(),
        );
        Self::with_client(config, http_client)
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(config: Config, http_client: T) -> Self {
        let backend = Backend::new(
            http_client,
            config.backend_url.clone(),
            config.probe_timeout(),
            config.chat_timeout(),
        );
        Self {
            config: Arc::new(config),
            backend,
        }
    }
}

/// Build the main router for the bridge
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/tags", get(handlers::tags))
        .route("/v1/models", get(handlers::models))
        // Chat histories are forwarded whole; Ollama decides what is too large.
        .route(
            "/v1/chat/completions",
            post(handlers::chat_completions).layer(DefaultBodyLimit::disable()),
        )
        .layer(cors)
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}
