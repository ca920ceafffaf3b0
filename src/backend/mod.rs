//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! Request (path, method)
//!     → scope.rs (home-set prefix check)
//!     → directory.rs (address book lookup)
//!       or store.rs (address object lookup / listing / query)
//!       or mutation.rs (refusal policy)
//!     → typed result or DavError
//! ```
//!
//! # Design Decisions
//! - The operation set is grouped behind the `CardDavBackend` trait so a
//!   persistent backend can replace the fixed one without touching the
//!   scope authority or the document model
//! - Seeded data is explicit configuration passed into constructors, never
//!   process-wide state
//! - State is built once at startup and shared immutably

pub mod directory;
pub mod mutation;
pub mod scope;
pub mod store;

use std::sync::Arc;

use crate::config::schema::{ContactConfig, ServerConfig};
use crate::dav::error::DavError;
use crate::vcard::Card;

pub use directory::{AddressBook, BookDirectory};
pub use scope::HomeScope;
pub use store::{AddressBookQuery, AddressObject, MatchType, ObjectStore, PropFilter, TextMatch};

/// The full CardDAV operation set.
///
/// Implementations must be cheap to call concurrently; no method may block
/// on anything beyond in-memory traversal.
pub trait CardDavBackend: Send + Sync {
    fn current_user_principal(&self) -> String;
    fn address_book_home_set_path(&self) -> String;

    fn list_address_books(&self) -> Result<Vec<AddressBook>, DavError>;
    fn get_address_book(&self, path: &str) -> Result<AddressBook, DavError>;
    fn create_address_book(&self, book: &AddressBook) -> Result<(), DavError>;
    fn delete_address_book(&self, path: &str) -> Result<(), DavError>;

    fn get_address_object(&self, path: &str) -> Result<AddressObject, DavError>;
    fn list_address_objects(&self, path: &str) -> Result<Vec<AddressObject>, DavError>;
    fn query_address_objects(
        &self,
        path: &str,
        query: &AddressBookQuery,
    ) -> Result<Vec<AddressObject>, DavError>;
    fn put_address_object(&self, path: &str, card: Card) -> Result<AddressObject, DavError>;
    fn delete_address_object(&self, path: &str) -> Result<(), DavError>;
}

/// Seed address objects from validated configuration.
pub fn seed_objects(contacts: &[ContactConfig]) -> Vec<AddressObject> {
    contacts
        .iter()
        .map(|contact| AddressObject {
            path: contact.path.clone(),
            mod_time: contact.modified,
            etag: contact.etag.clone(),
            card: contact.properties.clone(),
        })
        .collect()
}

/// Backend over a fixed, configuration-seeded resource set.
#[derive(Debug, Clone)]
pub struct FixedBackend {
    scope: HomeScope,
    directory: BookDirectory,
    store: ObjectStore,
}

impl FixedBackend {
    pub fn from_config(config: &ServerConfig) -> Self {
        let scope = HomeScope::new(&config.principal.path, &config.principal.home_set);
        let directory = BookDirectory::new(scope.clone(), &config.address_books);
        let store = ObjectStore::new(scope.clone(), seed_objects(&config.contacts));
        Self {
            scope,
            directory,
            store,
        }
    }

    pub fn into_shared(self) -> Arc<dyn CardDavBackend> {
        Arc::new(self)
    }
}

impl CardDavBackend for FixedBackend {
    fn current_user_principal(&self) -> String {
        self.scope.principal_path().to_string()
    }

    fn address_book_home_set_path(&self) -> String {
        self.scope.home_set_path()
    }

    fn list_address_books(&self) -> Result<Vec<AddressBook>, DavError> {
        Ok(self.directory.list())
    }

    fn get_address_book(&self, path: &str) -> Result<AddressBook, DavError> {
        self.directory.get(path)
    }

    fn create_address_book(&self, book: &AddressBook) -> Result<(), DavError> {
        mutation::create_address_book(book)
    }

    fn delete_address_book(&self, path: &str) -> Result<(), DavError> {
        mutation::delete_address_book(path)
    }

    fn get_address_object(&self, path: &str) -> Result<AddressObject, DavError> {
        self.store.get(path)
    }

    fn list_address_objects(&self, path: &str) -> Result<Vec<AddressObject>, DavError> {
        self.store.list(path)
    }

    fn query_address_objects(
        &self,
        path: &str,
        query: &AddressBookQuery,
    ) -> Result<Vec<AddressObject>, DavError> {
        self.store.query(path, query)
    }

    fn put_address_object(&self, path: &str, card: Card) -> Result<AddressObject, DavError> {
        mutation::put_address_object(path, &card)
    }

    fn delete_address_object(&self, path: &str) -> Result<(), DavError> {
        mutation::delete_address_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;

    #[test]
    fn test_fixed_backend_wires_the_seeded_fixture() {
        let backend = FixedBackend::from_config(&ServerConfig::default());
        assert_eq!(backend.current_user_principal(), "/ZGU/");
        assert_eq!(backend.address_book_home_set_path(), "/ZGU/contacts/");

        let books = backend.list_address_books().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].path, "/ZGU/contacts/default/");

        let objects = backend.list_address_objects("/ZGU/contacts/default/").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].path, "/ZGU/contacts/default/alice.vcf");
    }

    #[test]
    fn test_trait_object_is_usable() {
        let backend = FixedBackend::from_config(&ServerConfig::default()).into_shared();
        assert!(backend.get_address_object("/ZGU/contacts/default/alice.vcf").is_ok());
        assert_eq!(
            backend.delete_address_object("/ZGU/contacts/default/alice.vcf"),
            Err(DavError::MutationRefused)
        );
    }
}
