//! # x-gateway
//!
//! Serves the gateway over HTTP. See the library crate for the endpoint
//! catalog and configuration variables.

use log::{error, info};
use std::sync::Arc;

use x_gateway::{
    create_app, log_level_from_env, AppState, GatewayConfig, GatewayService, HttpTransport,
};

/// Main entry point for the gateway.
///
/// Loads configuration from the environment, builds the upstream transport
/// and router, and serves until SIGINT or SIGTERM. Configuration and bind
/// failures are logged and terminate the process with exit status 1.
///
/// # Example Usage
///
/// ```bash
/// TWITTER_BEARER_TOKEN=... cargo run
///
/// # Run on custom port with debug logging
/// SERVER_PORT=3000 RUST_LOG=debug TWITTER_BEARER_TOKEN=... cargo run
/// ```
#[tokio::main]
async fn main() {
    // RUST_LOG wins over LOG_LEVEL when both are set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level_from_env()),
    )
    .init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let transport = match HttpTransport::new(&config) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let service = GatewayService::new(Arc::new(transport), &config);
    let app = create_app(AppState::new(service));

    let addr = config.address();
    info!("Starting x-gateway on {}", addr);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received, draining connections");
}
