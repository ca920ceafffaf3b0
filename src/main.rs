//! CardDAV address-book server.
//!
//! Serves a fixed principal's address books and contact objects over the
//! WebDAV/CardDAV protocol, read-only behind a write-capable surface.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │                CARDDAV SERVER                  │
//!                 │                                                │
//!   DAV Request   │  ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────┼─▶│  http   │──▶│ handlers │──▶│  backend   │  │
//!                 │  │ server  │   │ dispatch │   │ scope/dir/ │  │
//!                 │  └─────────┘   └────┬─────┘   │ store/gate │  │
//!                 │                     │         └─────┬──────┘  │
//!                 │                     ▼               │         │
//!   DAV Response  │  ┌─────────┐   ┌──────────┐         │         │
//!   ◀─────────────┼──│response │◀──│   dav    │◀────────┘         │
//!                 │  │ render  │   │ document │                   │
//!                 │  └─────────┘   │  model   │                   │
//!                 │                └──────────┘                   │
//!                 │                                                │
//!                 │  config · observability · net/tls              │
//!                 └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use carddav_server::config::{load_config, ConfigError, ServerConfig};
use carddav_server::http::HttpServer;
use carddav_server::net::tls::load_tls_config;
use carddav_server::observability::logging::init_logging;
use carddav_server::observability::metrics::init_metrics;

#[derive(Parser)]
#[command(name = "carddav-server")]
#[command(about = "A read-only CardDAV address-book server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(ConfigError::Validation(errors)) => {
                for error in &errors {
                    eprintln!("config: {error}");
                }
                return Err(ConfigError::Validation(errors).into());
            }
            Err(e) => return Err(e.into()),
        },
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "carddav-server starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        principal = %config.principal.path,
        address_books = config.address_books.len(),
        contacts = config.contacts.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config);

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            let addr: SocketAddr = bind_address.parse()?;
            server.run_tls(addr, rustls).await?;
        }
        None => {
            tracing::warn!("TLS is not configured; serving plain HTTP");
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
