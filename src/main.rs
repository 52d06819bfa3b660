//! SecretGate binary entry point

use std::net::SocketAddr;

use secretgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Register metrics
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start HTTPS (or plain HTTP) server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG overrides logging.level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter_directives().into());

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Starting SecretGate..."
    );

    // 3. Initialize metrics
    secretgate::metrics::init_metrics()?;

    // 4. Initialize application state
    let state = AppState::new(config.clone())?;

    // 5. Build Axum router
    let app = secretgate::build_router(state);

    // 6. Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    if config.server.tls.enabled {
        let rustls_config = secretgate::server::load_tls(&config.server.tls)
            .await
            .inspect_err(|error| tracing::error!(%error, "Refusing to start without TLS"))?;

        tracing::info!("Server listening on https://{}", addr);
        tracing::info!("Public URL: {}", config.server.base_url());
        axum_server::bind_rustls(addr, rustls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        tracing::warn!("TLS disabled; serving plain HTTP");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", addr);
        tracing::info!("Public URL: {}", config.server.base_url());
        axum::serve(listener, app).await?;
    }

    Ok(())
}
