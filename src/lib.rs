//! Read-only CardDAV address-book server library.

pub mod backend;
pub mod config;
pub mod dav;
pub mod http;
pub mod net;
pub mod observability;
pub mod vcard;

pub use backend::{CardDavBackend, FixedBackend};
pub use config::ServerConfig;
pub use http::HttpServer;
