//! Write refusal policy.
//!
//! Every mutation is refused, unconditionally and deterministically. The
//! status split matters and must not drift:
//!
//! - object put/delete → 403. iOS reverts the locally-applied change
//!   shortly after a 403, which is exactly what a read-only server
//!   masquerading as writable wants
//! - collection create/delete → 501
//!
//! Because nothing ever reaches the directory or store, the fixed
//! collections are immutable structurally, not just by convention.

use crate::backend::directory::AddressBook;
use crate::backend::store::AddressObject;
use crate::dav::error::DavError;
use crate::vcard::Card;

pub fn create_address_book(book: &AddressBook) -> Result<(), DavError> {
    tracing::debug!(path = %book.path, "Refusing address book creation");
    Err(DavError::CollectionMutationRefused)
}

pub fn delete_address_book(path: &str) -> Result<(), DavError> {
    tracing::debug!(path, "Refusing address book deletion");
    Err(DavError::CollectionMutationRefused)
}

pub fn put_address_object(path: &str, _card: &Card) -> Result<AddressObject, DavError> {
    tracing::debug!(path, "Refusing address object write");
    Err(DavError::MutationRefused)
}

pub fn delete_address_object(path: &str) -> Result<(), DavError> {
    tracing::debug!(path, "Refusing address object deletion");
    Err(DavError::MutationRefused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcard::Field;

    #[test]
    fn test_object_mutations_are_forbidden() {
        let mut card = Card::new();
        card.insert("FN", Field::new("Anyone"));

        for path in ["/ZGU/contacts/default/alice.vcf", "/OTHER/x.vcf"] {
            assert_eq!(
                put_address_object(path, &card),
                Err(DavError::MutationRefused)
            );
            assert_eq!(
                put_address_object(path, &Card::new()),
                Err(DavError::MutationRefused)
            );
            assert_eq!(delete_address_object(path), Err(DavError::MutationRefused));
        }
    }

    #[test]
    fn test_collection_mutations_are_not_implemented() {
        let book = AddressBook {
            path: "/ZGU/contacts/new/".into(),
            name: "New".into(),
            description: String::new(),
            max_resource_size: 0,
            supported_address_data: None,
        };
        assert_eq!(
            create_address_book(&book),
            Err(DavError::CollectionMutationRefused)
        );
        assert_eq!(
            delete_address_book("/ZGU/contacts/default/"),
            Err(DavError::CollectionMutationRefused)
        );
    }
}
