//! registry-server - REST API server binary.

use anyhow::Context;
use registry_core::{RegistryConfig, Runtime};
use registry_server::{create_server, AppState, ServerConfig};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("registry_server=debug".parse()?),
        )
        .init();

    let server_config = ServerConfig::from_env()?;
    let registry_config = RegistryConfig::from_env()?;

    // Storage, relay and webhook dispatcher
    let mut runtime = Runtime::new(registry_config).context("failed to create registry runtime")?;
    runtime.start()?;

    if server_config.is_read_only() {
        warn!("REGISTRY_API_KEY not set, API will run in read-only mode");
    }

    let state = AppState::new(runtime.database(), server_config.api_key.clone());
    let app = create_server(state);

    let addr = server_config.addr()?;
    info!(
        environment = %server_config.environment,
        "Starting registry-server on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // In-flight webhook deliveries are abandoned on exit
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!(
        dropped_notifications = runtime.relay().dropped(),
        "Server stopped"
    );
    Ok(())
}
