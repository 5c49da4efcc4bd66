use anyhow::Context as _;
use clap::Parser as _;
use kaede_bridge::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    config::{Config, LogFormat},
    status,
};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment and flags still apply.
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    println!("{}", status::banner(&config));
    info!("Starting Kaede Bridge with config: {:?}", config);

    let app_state = AppState::new(config.clone());
    let backend_status = app_state.backend.check().await;
    println!("{}", status::report(&config, &backend_status));
    if backend_status.available {
        info!(
            models = backend_status.models.len(),
            "Ollama available at {}", config.backend_url
        );
    } else {
        warn!("Ollama not available at {}", config.backend_url);
        println!("{}\n", status::unavailable_warning());
    }

    let mut router = build_router(app_state);

    if config.metrics {
        let (prometheus_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics server to {metrics_addr}"))?;
        info!("Metrics endpoint listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, build_metrics_router(handle)).await {
                tracing::error!("Metrics server stopped: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Kaede Bridge listening on {}", bind_addr);
    for line in status::serving_lines(config.port) {
        println!("{line}");
    }
    println!("Press CTRL+C to quit\n");

    axum::serve(listener, router).await?;

    Ok(())
}
