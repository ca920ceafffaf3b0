//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (contacts fall under the home set)
//! - Validate path slashing rules and listener addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::backend::scope::HomeScope;
use crate::config::schema::ServerConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("principal path {0:?} must begin and end with '/'")]
    PrincipalPath(String),

    #[error("address book segment must not be empty")]
    EmptyBookSegment,

    #[error("duplicate address book segment {0:?}")]
    DuplicateBookSegment(String),

    #[error("contact path {path:?} is outside the home set {home_set:?}")]
    ContactOutsideHomeSet { path: String, home_set: String },

    #[error("duplicate contact path {0:?}")]
    DuplicateContactPath(String),

    #[error("contact path {0:?} must not end with '/'")]
    ContactPathIsCollection(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let principal = &config.principal.path;
    if !principal.starts_with('/') || !principal.ends_with('/') {
        errors.push(ValidationError::PrincipalPath(principal.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut segments = HashSet::new();
    for book in &config.address_books {
        let segment = book.segment.trim_matches('/');
        if segment.is_empty() {
            errors.push(ValidationError::EmptyBookSegment);
        } else if !segments.insert(segment.to_string()) {
            errors.push(ValidationError::DuplicateBookSegment(segment.to_string()));
        }
    }

    let home_set = HomeScope::new(principal, &config.principal.home_set).home_set_path();
    let mut paths = HashSet::new();
    for contact in &config.contacts {
        if !contact.path.starts_with(&home_set) {
            errors.push(ValidationError::ContactOutsideHomeSet {
                path: contact.path.clone(),
                home_set: home_set.clone(),
            });
        }
        if contact.path.ends_with('/') {
            errors.push(ValidationError::ContactPathIsCollection(
                contact.path.clone(),
            ));
        }
        if !paths.insert(contact.path.clone()) {
            errors.push(ValidationError::DuplicateContactPath(contact.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
