//! Network layer subsystem.
//!
//! Socket accept loops and HTTP protocol handling live in the http module
//! (axum); this module owns what sits below it, currently TLS material
//! loading for the HTTPS listener.

pub mod tls;
