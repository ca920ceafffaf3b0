//! Address book enumeration.
//!
//! The set of collections is fixed at startup from configuration; there is
//! no code path that adds or removes a book at runtime.

use crate::backend::scope::HomeScope;
use crate::config::schema::{AddressBookConfig, AddressDataType};
use crate::dav::error::DavError;

/// A named address-book collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBook {
    /// Canonical slash-terminated path, always under the home set.
    pub path: String,
    pub name: String,
    pub description: String,
    /// Maximum accepted resource size in bytes.
    pub max_resource_size: u64,
    /// Media types accepted for address data, `None` for the defaults.
    pub supported_address_data: Option<Vec<AddressDataType>>,
}

/// Directory of the principal's address books.
#[derive(Debug, Clone)]
pub struct BookDirectory {
    scope: HomeScope,
    books: Vec<AddressBook>,
}

impl BookDirectory {
    /// Joins every configured book under the scope's home-set path.
    pub fn new(scope: HomeScope, configs: &[AddressBookConfig]) -> Self {
        let home = scope.home_set_path();
        let books = configs
            .iter()
            .map(|config| AddressBook {
                path: format!("{}{}/", home, config.segment.trim_matches('/')),
                name: config.display_name.clone(),
                description: config.description.clone(),
                max_resource_size: config.max_resource_size,
                supported_address_data: config.supported_address_data.clone(),
            })
            .collect();
        Self { scope, books }
    }

    /// The fixed set of collections, in configuration order.
    pub fn list(&self) -> Vec<AddressBook> {
        self.books.clone()
    }

    /// Scope-check, then exact path match.
    pub fn get(&self, path: &str) -> Result<AddressBook, DavError> {
        self.scope.check(path)?;
        self.books
            .iter()
            .find(|book| book.path == path)
            .cloned()
            .ok_or(DavError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;

    fn seeded_directory() -> BookDirectory {
        let config = ServerConfig::default();
        let scope = HomeScope::new(&config.principal.path, &config.principal.home_set);
        BookDirectory::new(scope, &config.address_books)
    }

    #[test]
    fn test_list_returns_the_seeded_default_book() {
        let books = seeded_directory().list();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].path, "/ZGU/contacts/default/");
        assert_eq!(books[0].name, "My contacts");
        assert_eq!(books[0].max_resource_size, 1024);
    }

    #[test]
    fn test_get_matches_exact_path_only() {
        let directory = seeded_directory();
        assert!(directory.get("/ZGU/contacts/default/").is_ok());
        assert_eq!(
            directory.get("/ZGU/contacts/other/"),
            Err(DavError::NotFound)
        );
        // missing trailing slash is a different path
        assert_eq!(
            directory.get("/ZGU/contacts/default"),
            Err(DavError::NotFound)
        );
    }

    #[test]
    fn test_get_scope_checks_before_lookup() {
        let directory = seeded_directory();
        assert_eq!(
            directory.get("/OTHER/contacts/default/"),
            Err(DavError::ScopeViolation)
        );
    }
}
