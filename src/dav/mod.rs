//! DAV document model subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound XML body
//!     → multistatus.rs (namespace-aware decode)
//!     → ResponseEntry.outcome() (success | StructuredError)
//!
//! Outbound reply:
//!     backend results
//!     → element.rs (property elements, closed child variants)
//!     → multistatus.rs (batch document)
//!     → encode_document (namespaced XML bytes)
//! ```
//!
//! # Design Decisions
//! - Timestamps are their own codec: clients compare them as strings and
//!   as instants, so encoding must round-trip exactly
//! - Errors are typed and deterministic; the transport renders status lines
//! - Tag-level XML tokenization is delegated to quick-xml

pub mod element;
pub mod error;
pub mod multistatus;
pub mod timestamp;

pub use error::DavError;
pub use multistatus::{Condition, MultiStatus, PropStat, ResponseEntry, Status, StructuredError};
pub use timestamp::Timestamp;
