//! Integration tests for the bridge
//!
//! These run the bridge with its real hyper client against a small fake Ollama server bound to an
//! ephemeral local port, so connection failures and timeouts are real.

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
};
use clap::Parser;
use kaede_bridge::{AppState, build_router, config::Config};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::util::ServiceExt; // for oneshot()

/// Starts `router` on 127.0.0.1 and returns its address.
async fn spawn_ollama(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on. The port is released on return and the OS does not hand out a
/// just-freed ephemeral port again right away, so it stays closed for the length of a test.
async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn fake_ollama() -> Router {
    Router::new()
        .route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama3.2", "size": 2019393189}]})) }),
        )
        .route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let model = body["model"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "id": "chatcmpl-42",
                    "object": "chat.completion",
                    "model": model,
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "Hola! Que tal tu dia?"},
                        "finish_reason": "stop"
                    }]
                }))
            }),
        )
}

fn bridge_config(addr: SocketAddr) -> Config {
    Config::parse_from([
        "kaede-bridge".to_string(),
        "--backend-url".to_string(),
        format!("http://{addr}"),
        "--model".to_string(),
        "llama3.2".to_string(),
    ])
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn chat_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_round_trip_through_real_backend() {
    let addr = spawn_ollama(fake_ollama()).await;
    let app = build_router(AppState::new(bridge_config(addr)));

    let response = app
        .oneshot(chat_request(&json!({
            "model": "llama3.2",
            "messages": [{"role": "user", "content": "Hola"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], "chatcmpl-42");
    assert_eq!(body["model"], "llama3.2");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_backend_status_is_relayed_for_chat() {
    let ollama = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "model \"ghost\" not found, try pulling it first"})),
            )
        }),
    );
    let addr = spawn_ollama(ollama).await;
    let app = build_router(AppState::new(bridge_config(addr)));

    let response = app
        .oneshot(chat_request(&json!({"model": "ghost", "messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({"error": "ollama error"}));
}

#[tokio::test]
async fn test_slow_backend_yields_gateway_timeout() {
    let ollama = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({}))
        }),
    );
    let addr = spawn_ollama(ollama).await;
    let mut app_state = AppState::new(bridge_config(addr));
    app_state.backend = app_state
        .backend
        .with_chat_timeout(Duration::from_millis(200));
    let app = build_router(app_state);

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        app.oneshot(chat_request(&json!({"model": "llama3.2", "messages": []}))),
    )
    .await
    .expect("the bridge must not hang on a silent backend")
    .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_models_are_listed_in_openai_format() {
    let addr = spawn_ollama(fake_ollama()).await;
    let app = build_router(AppState::new(bridge_config(addr)));

    let response = app.oneshot(get_request("/v1/models")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "object": "list",
            "data": [{"id": "llama3.2", "object": "model", "owned_by": "ollama"}]
        })
    );
}

#[tokio::test]
async fn test_status_endpoints_with_live_backend() {
    let addr = spawn_ollama(fake_ollama()).await;
    let app = build_router(AppState::new(bridge_config(addr)));

    let response = app.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["backendAvailable"], true);
    assert_eq!(body["models"], json!(["llama3.2"]));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let addr = closed_port().await;
    let app = build_router(AppState::new(bridge_config(addr)));

    let response = app.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["backendAvailable"], false);

    let response = app.clone().oneshot(get_request("/api/tags")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(response).await["error"].is_string());

    let response = app.clone().oneshot(get_request("/v1/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app
        .oneshot(chat_request(&json!({"model": "llama3.2", "messages": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
