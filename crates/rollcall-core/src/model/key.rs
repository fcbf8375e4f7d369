// ── Storage keys ──
//
// `"<collection>_<id>"` is the only addressing mechanism in the local
// store. Collection names may not contain the separator, otherwise the
// prefix scan for one collection would pick up another's records.

use std::fmt;

use crate::error::CoreError;

pub const SEPARATOR: char = '_';

/// Key holding the persisted device identity.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Collection names whose prefixes collide with the layer's own keys.
const RESERVED_COLLECTIONS: [&str; 3] = ["cache", "deleted", "options"];

/// Validate a collection name for use as a key prefix.
pub fn validate_collection(collection: &str) -> Result<(), CoreError> {
    let reason = if collection.is_empty() {
        "collection name is empty"
    } else if collection.contains(SEPARATOR) {
        "collection name contains '_'"
    } else if RESERVED_COLLECTIONS.contains(&collection) {
        "collection name is reserved"
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidKey {
        key: collection.to_owned(),
        reason: reason.into(),
    })
}

/// Prefix shared by every record key of `collection`.
pub fn collection_prefix(collection: &str) -> String {
    format!("{collection}{SEPARATOR}")
}

pub fn options_key(field: &str) -> String {
    format!("options_{field}")
}

pub fn deleted_options_key(field: &str) -> String {
    format!("deleted_options_{field}")
}

pub fn cache_key(collection: &str) -> String {
    format!("cache_{collection}")
}

/// A validated `(collection, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    collection: String,
    id: String,
}

impl StorageKey {
    pub fn new(collection: &str, id: &str) -> Result<Self, CoreError> {
        validate_collection(collection)?;
        if id.is_empty() {
            return Err(CoreError::InvalidKey {
                key: collection_prefix(collection),
                reason: "record id is empty".into(),
            });
        }
        Ok(Self {
            collection: collection.to_owned(),
            id: id.to_owned(),
        })
    }

    /// Check a caller-supplied key against the pair it claims to address.
    pub fn verify(key: &str, collection: &str, id: &str) -> Result<Self, CoreError> {
        let expected = Self::new(collection, id)?;
        if key == expected.to_string() {
            Ok(expected)
        } else {
            Err(CoreError::InvalidKey {
                key: key.to_owned(),
                reason: format!("expected '{expected}' for collection '{collection}' and id '{id}'"),
            })
        }
    }

    /// Recover the id from a raw key of `collection`, if it belongs to it.
    pub fn id_from_key<'a>(key: &'a str, collection: &str) -> Option<&'a str> {
        key.strip_prefix(collection)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .filter(|id| !id.is_empty())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.collection, self.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_with_underscore() {
        let key = StorageKey::new("employees", "e-42").unwrap();
        assert_eq!(key.to_string(), "employees_e-42");
    }

    #[test]
    fn ids_may_contain_separator() {
        let key = StorageKey::new("cases", "a_b").unwrap();
        assert_eq!(key.to_string(), "cases_a_b");
        assert_eq!(StorageKey::id_from_key("cases_a_b", "cases"), Some("a_b"));
    }

    #[test]
    fn rejects_bad_collections() {
        assert!(StorageKey::new("", "1").is_err());
        assert!(StorageKey::new("leave_requests", "1").is_err());
        assert!(StorageKey::new("options", "1").is_err());
        assert!(StorageKey::new("cases", "").is_err());
    }

    #[test]
    fn verify_catches_mismatch() {
        assert!(StorageKey::verify("cases_c1", "cases", "c1").is_ok());
        let err = StorageKey::verify("case_c1", "cases", "c1").unwrap_err();
        assert!(matches!(err, CoreError::InvalidKey { .. }));
    }

    #[test]
    fn id_from_key_requires_exact_prefix() {
        assert_eq!(StorageKey::id_from_key("employeesX_1", "employees"), None);
        assert_eq!(StorageKey::id_from_key("employees_", "employees"), None);
        assert_eq!(StorageKey::id_from_key("employees_7", "employees"), Some("7"));
    }
}
