//! registry-server - REST API server for the software registry.
//!
//! This crate exposes publishers, software, logs and webhooks over HTTP.
//! Every write to a publisher or a software entry is recorded in the event
//! ledger and dispatched to matching webhooks by `registry-core`.
//!
//! # Example
//!
//! ```ignore
//! use registry_core::{RegistryConfig, Runtime};
//! use registry_server::{create_server, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = Runtime::new(RegistryConfig::from_env()?)?;
//!     runtime.start()?;
//!
//!     let config = ServerConfig::from_env()?;
//!     let app = create_server(AppState::new(runtime.database(), config.api_key.clone()));
//!
//!     let listener = tokio::net::TcpListener::bind(config.addr()?).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
