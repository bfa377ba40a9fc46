use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use captcha_api::api::{create_router, AppState};
use captcha_api::config::{Config, LoggingConfig};
use captcha_api::engine::{EngineProvider, RecognitionEngine};

#[derive(Parser)]
#[command(name = "captcha-api")]
#[command(about = "Self-hostable CAPTCHA recognition API")]
struct Args {
    /// Bind address, overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "captcha_api={level},tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    if config.server.api_keys.is_empty() {
        tracing::warn!("API_KEYS is not set - captcha endpoints accept unauthenticated requests");
    }

    let engine = EngineProvider::new(&config.engine);
    if !engine.is_available() {
        tracing::warn!("OCR, detection and slider endpoints will return 503 until an engine is configured");
    }
    let engine: Arc<dyn RecognitionEngine> = Arc::new(engine);

    let state = AppState::new(config.clone(), engine)?;
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    tracing::info!("Captcha API starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/apispec.json", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
