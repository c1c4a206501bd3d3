//! Ethereum nonce authentication server
//!
//! Serves the register / nonce / signin handshake over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use eth_nonce_auth::auth::{AuthService, NonceGenerator, OsNonceGenerator};
use eth_nonce_auth::config::Config;
use eth_nonce_auth::routes::create_app;
use eth_nonce_auth::state::AppState;
use eth_nonce_auth::store::{MemoryUserStore, UserStore};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %format!("{e:#}"), "Server terminated with error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let nonces: Arc<dyn NonceGenerator> = Arc::new(OsNonceGenerator);
    let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new(
        nonces.clone(),
        config.nonce_ttl(),
    ));

    let auth_service = Arc::new(AuthService::new(
        store,
        nonces,
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    ));

    let app_state = AppState::new(auth_service, config.clone());
    let app = create_app(app_state);

    let addr = SocketAddr::new(config.host, config.port);

    tracing::info!(
        environment = config.environment.as_str(),
        nonce_ttl_seconds = config.auth_nonce_ttl_seconds,
        "Server listening on {}",
        addr
    );
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
