//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → request.rs (request ID)
//!     → handlers.rs (DAV method dispatch, backend calls)
//!     → response.rs (multistatus / vCard / error rendering)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
