//! Protocol error taxonomy.
//!
//! # Responsibilities
//! - One typed error per refusal class (scope, missing resource, capability,
//!   mutation policy, decode failure)
//! - Map each error to the HTTP status the transport must render
//!
//! # Design Decisions
//! - Refusals are deterministic functions of (path, principal, operation);
//!   no variant carries retryable state
//! - Decode failures are surfaced, never defaulted
//! - The 403/501 split for mutations is load-bearing: some clients revert
//!   local edits on 403, which is what a read-only deployment wants

use axum::http::StatusCode;
use thiserror::Error;

/// Error type shared by the backend and the DAV document model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DavError {
    /// The request path is not under the principal's home set.
    #[error("carddav: outside of address book home set")]
    ScopeViolation,

    /// Path is in scope but names no resource.
    #[error("carddav: resource not found")]
    NotFound,

    /// Structured filtering is a required protocol capability this server
    /// does not provide. Must fail loudly, never return a partial set.
    #[error("carddav: addressbook-query is not supported")]
    QueryNotImplemented,

    /// Address object writes are refused.
    #[error("carddav: address object writes are not supported")]
    MutationRefused,

    /// Address book creation/deletion is refused.
    #[error("carddav: address book management is not supported")]
    CollectionMutationRefused,

    /// Text did not conform to the timestamp grammar.
    #[error("carddav: invalid timestamp {input:?}")]
    InvalidTimestamp { input: String },

    /// Malformed XML or vCard document.
    #[error("carddav: malformed document: {0}")]
    Decode(String),
}

impl DavError {
    /// Status line the transport renders for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DavError::ScopeViolation => StatusCode::FORBIDDEN,
            DavError::NotFound => StatusCode::NOT_FOUND,
            DavError::QueryNotImplemented => StatusCode::NOT_IMPLEMENTED,
            DavError::MutationRefused => StatusCode::FORBIDDEN,
            DavError::CollectionMutationRefused => StatusCode::NOT_IMPLEMENTED,
            DavError::InvalidTimestamp { .. } => StatusCode::BAD_REQUEST,
            DavError::Decode(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(err: quick_xml::Error) -> Self {
        DavError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DavError::ScopeViolation.status(), StatusCode::FORBIDDEN);
        assert_eq!(DavError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(DavError::MutationRefused.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            DavError::CollectionMutationRefused.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            DavError::QueryNotImplemented.status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
