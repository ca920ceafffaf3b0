//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the DAV catch-all handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the server to a listener, plain or TLS
//!
//! # Design Decisions
//! - One catch-all route: DAV dispatch is by method, not path shape
//! - The backend sits behind the trait so tests and future storage can
//!   substitute their own

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::backend::{CardDavBackend, FixedBackend};
use crate::config::schema::ServerConfig;
use crate::http::handlers::dav_handler;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CardDavBackend>,
    pub max_body_size: usize,
}

/// HTTP server for the CardDAV backend.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server over the fixed, configuration-seeded backend.
    pub fn new(config: ServerConfig) -> Self {
        let backend = FixedBackend::from_config(&config).into_shared();
        Self::with_backend(config, backend)
    }

    /// Create a server over any backend implementation.
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn CardDavBackend>) -> Self {
        let state = AppState {
            backend,
            max_body_size: config.security.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dav_handler))
            .route("/", any(dav_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS.
    pub async fn run_tls(self, addr: SocketAddr, tls: RustlsConfig) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        axum_server::bind_rustls(addr, tls)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
