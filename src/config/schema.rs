//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.
//! Defaults reproduce the fixed principal and address data the server was
//! originally deployed with, so a config file is optional.

use serde::{Deserialize, Serialize};

use crate::dav::timestamp::Timestamp;
use crate::vcard::{Card, Field};

/// Root configuration for the CardDAV server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// The authenticated principal and its home set.
    pub principal: PrincipalConfig,

    /// Address book collections exposed under the home set.
    pub address_books: Vec<AddressBookConfig>,

    /// Seeded contact resources.
    pub contacts: Vec<ContactConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening settings.
    pub security: SecurityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            principal: PrincipalConfig::default(),
            address_books: vec![AddressBookConfig::default()],
            contacts: default_contacts(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Optional TLS configuration. CardDAV clients generally insist on
    /// HTTPS; plain HTTP is mostly useful for tests.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// The authenticated principal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrincipalConfig {
    /// Principal path; must begin and end with a slash.
    pub path: String,

    /// Relative segment of the address book home set beneath the
    /// principal path; a slash is appended if needed.
    pub home_set: String,
}

impl Default for PrincipalConfig {
    fn default() -> Self {
        Self {
            path: "/ZGU/".to_string(),
            home_set: "contacts".to_string(),
        }
    }
}

/// One address book collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressBookConfig {
    /// Path segment under the home set, e.g. "default".
    pub segment: String,

    /// Display name shown by clients.
    pub display_name: String,

    /// Human-readable description.
    pub description: String,

    /// Maximum accepted resource size in bytes.
    pub max_resource_size: u64,

    /// Accepted address data media types; omit for the server defaults.
    pub supported_address_data: Option<Vec<AddressDataType>>,
}

impl Default for AddressBookConfig {
    fn default() -> Self {
        Self {
            segment: "default".to_string(),
            display_name: "My contacts".to_string(),
            description: "Default address book".to_string(),
            max_resource_size: 1024,
            supported_address_data: None,
        }
    }
}

/// An address data media type a collection accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AddressDataType {
    pub content_type: String,
    pub version: String,
}

/// One seeded contact resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactConfig {
    /// Full canonical path; must fall under the home set.
    pub path: String,

    /// Opaque entity tag for conditional requests.
    pub etag: String,

    /// Last modification instant, in HTTP-date form.
    pub modified: Timestamp,

    /// Card properties.
    pub properties: Card,
}

fn default_contacts() -> Vec<ContactConfig> {
    let mut card = Card::new();
    card.insert("FN", Field::new("Fest T"));
    card.insert("N", Field::new("T;Fest;;;"));
    card.insert("PRODID", Field::new("-//Apple Inc.//iOS 17.5.1//EN"));
    card.insert("REV", Field::new("2024-08-25T08:27:42Z"));
    card.insert("UID", Field::new("A4DCAEA8-996C-4113-AD57-4D66BC05E986"));
    card.insert("VERSION", Field::new("3.0"));

    vec![ContactConfig {
        path: "/ZGU/contacts/default/alice.vcf".to_string(),
        etag: "sQNI/mCtS7HUYkK+447YWozmRX10-Fest".to_string(),
        // 2024-08-25T08:27:42Z
        modified: Timestamp::from_unix(1_724_574_462).expect("seed instant in range"),
        properties: card,
    }]
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
