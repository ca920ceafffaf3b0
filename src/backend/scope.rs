//! Path and permission authority.
//!
//! # Responsibilities
//! - Compute the canonical home-set path for the authenticated principal
//! - Decide whether a request path falls inside that home set
//!
//! # Design Decisions
//! - Scope is a literal string-prefix test against the home-set path.
//!   Paths are compared as-is: callers must pass normalized paths, `..`
//!   segments are not resolved. Known hardening gap, preserved on purpose;
//!   do not canonicalize here without revising the protocol contract.
//! - Checked before any lookup, so out-of-scope probes cannot distinguish
//!   existing from missing resources

use crate::dav::error::DavError;

/// Path authority for one authenticated principal.
#[derive(Debug, Clone)]
pub struct HomeScope {
    principal_path: String,
    home_segment: String,
}

impl HomeScope {
    /// `principal_path` must begin and end with `/`; `home_segment` is the
    /// relative collection name beneath it, e.g. `"contacts"`.
    pub fn new(principal_path: impl Into<String>, home_segment: impl Into<String>) -> Self {
        Self {
            principal_path: principal_path.into(),
            home_segment: home_segment.into(),
        }
    }

    pub fn principal_path(&self) -> &str {
        &self.principal_path
    }

    /// Home-set collection path, with exactly one trailing slash no matter
    /// how the configured segment is slashed.
    pub fn home_set_path(&self) -> String {
        let base = self.principal_path.trim_end_matches('/');
        let segment = self.home_segment.trim_matches('/');
        if segment.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, segment)
        }
    }

    /// Reject paths outside the principal's home set.
    pub fn check(&self, path: &str) -> Result<(), DavError> {
        if path.starts_with(&self.home_set_path()) {
            Ok(())
        } else {
            Err(DavError::ScopeViolation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_set_path_has_exactly_one_trailing_slash() {
        for segment in ["contacts", "contacts/", "/contacts/"] {
            let scope = HomeScope::new("/ZGU/", segment);
            assert_eq!(scope.home_set_path(), "/ZGU/contacts/");
        }
        assert_eq!(HomeScope::new("/ZGU/", "").home_set_path(), "/ZGU/");
        assert_eq!(HomeScope::new("/", "contacts").home_set_path(), "/contacts/");
    }

    #[test]
    fn test_check_accepts_paths_under_home_set() {
        let scope = HomeScope::new("/ZGU/", "contacts");
        assert!(scope.check("/ZGU/contacts/default/alice.vcf").is_ok());
        assert!(scope.check("/ZGU/contacts/").is_ok());
    }

    #[test]
    fn test_check_rejects_foreign_paths() {
        let scope = HomeScope::new("/ZGU/", "contacts");
        assert_eq!(
            scope.check("/OTHER/contacts/x"),
            Err(DavError::ScopeViolation)
        );
        assert_eq!(scope.check("/ZGU/"), Err(DavError::ScopeViolation));
        assert_eq!(scope.check(""), Err(DavError::ScopeViolation));
    }

    #[test]
    fn test_check_is_a_literal_prefix_test() {
        // No canonicalization: a dotted path that literally carries the
        // prefix passes, one that does not is rejected.
        let scope = HomeScope::new("/ZGU/", "contacts");
        assert!(scope.check("/ZGU/contacts/../secrets").is_ok());
        assert!(scope.check("/ZGU/./contacts/default/").is_err());
    }
}
