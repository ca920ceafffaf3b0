//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → seeds the backend, shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults reproducing the original fixed deployment,
//!   so the server runs without any config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AddressBookConfig, ContactConfig, ListenerConfig, ObservabilityConfig, PrincipalConfig,
    SecurityConfig, ServerConfig, TimeoutConfig, TlsConfig,
};
