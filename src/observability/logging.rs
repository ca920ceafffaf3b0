//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Derive the default filter from configuration, overridable via
//!   `RUST_LOG`
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Environment takes precedence over config so operators can raise
//!   verbosity without editing files

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let default_filter = format!(
        "carddav_server={},tower_http=info",
        config.log_level
    );
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
