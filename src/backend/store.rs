//! Address object storage and lookup.
//!
//! # Responsibilities
//! - Exact-path fetch and prefix listing of contact resources
//! - The structured-query entry point, which refuses loudly
//!
//! # Design Decisions
//! - Objects are seeded once at construction and never mutated; concurrent
//!   reads need no coordination
//! - Listing preserves insertion order, it is not sorted
//! - `query` must never degrade to an unfiltered listing: a client would
//!   read an empty or wrong answer as "no matches" when the true answer is
//!   "capability absent"

use crate::backend::scope::HomeScope;
use crate::dav::error::DavError;
use crate::dav::timestamp::Timestamp;
use crate::vcard::Card;

/// A single contact resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObject {
    /// Canonical path, unique within the store.
    pub path: String,
    pub mod_time: Timestamp,
    /// Opaque version token for conditional requests.
    pub etag: String,
    pub card: Card,
}

/// Text-match predicate of the protocol's query grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub value: String,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchType {
    Equals,
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

/// Per-property filter within an address book query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropFilter {
    pub name: String,
    pub text_match: Option<TextMatch>,
}

/// Structured filter over a collection's objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBookQuery {
    pub prop_filters: Vec<PropFilter>,
    pub limit: Option<usize>,
}

/// In-memory store of the principal's contact resources.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    scope: HomeScope,
    objects: Vec<AddressObject>,
}

impl ObjectStore {
    pub fn new(scope: HomeScope, objects: Vec<AddressObject>) -> Self {
        Self { scope, objects }
    }

    /// Scope-check, then exact path match.
    pub fn get(&self, path: &str) -> Result<AddressObject, DavError> {
        self.scope.check(path)?;
        self.objects
            .iter()
            .find(|object| object.path == path)
            .cloned()
            .ok_or(DavError::NotFound)
    }

    /// Scope-check, then every object whose path has `path` as a prefix:
    /// all objects under a collection, or a single object on an exact path.
    pub fn list(&self, path: &str) -> Result<Vec<AddressObject>, DavError> {
        self.scope.check(path)?;
        Ok(self
            .objects
            .iter()
            .filter(|object| object.path.starts_with(path))
            .cloned()
            .collect())
    }

    /// Structured filtering is not implemented. Always a typed refusal,
    /// regardless of path or filter.
    pub fn query(
        &self,
        path: &str,
        query: &AddressBookQuery,
    ) -> Result<Vec<AddressObject>, DavError> {
        tracing::warn!(
            path,
            filters = query.prop_filters.len(),
            "Refusing addressbook-query"
        );
        Err(DavError::QueryNotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::seed_objects;
    use crate::config::schema::ServerConfig;

    const ALICE: &str = "/ZGU/contacts/default/alice.vcf";

    fn seeded_store() -> ObjectStore {
        let config = ServerConfig::default();
        let scope = HomeScope::new(&config.principal.path, &config.principal.home_set);
        ObjectStore::new(scope, seed_objects(&config.contacts))
    }

    #[test]
    fn test_get_returns_the_seeded_object() {
        let object = seeded_store().get(ALICE).unwrap();
        assert_eq!(object.etag, "sQNI/mCtS7HUYkK+447YWozmRX10-Fest");
        assert_eq!(object.card.preferred_value("FN"), Some("Fest T"));
    }

    #[test]
    fn test_get_misses_are_not_found() {
        let store = seeded_store();
        assert_eq!(
            store.get("/ZGU/contacts/default/bob.vcf"),
            Err(DavError::NotFound)
        );
        assert_eq!(
            store.get("/OTHER/contacts/default/alice.vcf"),
            Err(DavError::ScopeViolation)
        );
    }

    #[test]
    fn test_list_matches_by_prefix() {
        let store = seeded_store();
        assert_eq!(store.list("/ZGU/contacts/default/").unwrap().len(), 1);
        assert_eq!(store.list(ALICE).unwrap().len(), 1);
        assert!(store.list("/ZGU/contacts/empty/").unwrap().is_empty());
    }

    #[test]
    fn test_query_always_refuses() {
        let store = seeded_store();
        let query = AddressBookQuery::default();
        assert_eq!(
            store.query("/ZGU/contacts/default/", &query),
            Err(DavError::QueryNotImplemented)
        );
        // even out of scope: the capability refusal wins
        assert_eq!(
            store.query("/OTHER/", &query),
            Err(DavError::QueryNotImplemented)
        );
    }
}
