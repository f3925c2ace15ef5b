//! Allow-list for dynamic filter fields
//!
//! A filter field is the one caller-controlled identifier that reaches query
//! text: column names cannot be bound as parameters. A field is only
//! accepted when it is a plain identifier whose snake-case column is a
//! queryable column of the entity catalog. Columns marked secret in any
//! entity are never accepted.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use crate::database::catalog::ENTITY_CATALOG;
use crate::database::core::{is_plain_identifier, snake_string, EntityDescriptor};

/// Set of column names that may be used as a filter target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAllowList {
    columns: HashSet<String>,
}

impl FieldAllowList {
    /// Queryable columns across all given entities
    pub fn from_catalog(catalog: &[EntityDescriptor]) -> Self {
        let secret: HashSet<String> = catalog
            .iter()
            .flat_map(|e| e.columns.iter())
            .filter(|c| !c.queryable)
            .map(|c| c.column_name())
            .collect();

        let columns = catalog
            .iter()
            .flat_map(|e| e.columns.iter())
            .filter(|c| c.queryable)
            .map(|c| c.column_name())
            .filter(|c| !secret.contains(c))
            .collect();

        Self { columns }
    }

    /// Queryable columns of a single entity
    pub fn for_entity(entity: &EntityDescriptor) -> Self {
        Self::from_catalog(std::slice::from_ref(entity))
    }

    /// Whether `field` may be interpolated as a filter column
    pub fn allows(&self, field: &str) -> bool {
        is_plain_identifier(field) && self.columns.contains(&snake_string(field))
    }

    /// Allowed column names, sorted
    pub fn columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// The allow-list built from the full entity catalog
pub fn default_allow_list() -> &'static FieldAllowList {
    static ALLOW_LIST: OnceLock<FieldAllowList> = OnceLock::new();
    ALLOW_LIST.get_or_init(|| FieldAllowList::from_catalog(ENTITY_CATALOG))
}

/// Check a filter field against the default allow-list
pub fn filter_field(field: &str) -> bool {
    default_allow_list().allows(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::catalog::find_entity;

    #[test]
    fn test_allows_catalog_columns() {
        assert!(filter_field("name"));
        assert!(filter_field("displayName"));
        assert!(filter_field("display_name"));
        assert!(filter_field("email"));
        assert!(filter_field("createdTime"));
    }

    #[test]
    fn test_rejects_secrets() {
        assert!(!filter_field("password"));
        assert!(!filter_field("passwordSalt"));
        assert!(!filter_field("clientSecret"));
        assert!(!filter_field("accessToken"));
        assert!(!filter_field("privateKey"));
        assert!(!filter_field("code"));
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        assert!(!filter_field(""));
        assert!(!filter_field("nonexistent"));
        assert!(!filter_field("name OR 1=1"));
        assert!(!filter_field("name;--"));
        assert!(!filter_field("\"name\""));
    }

    #[test]
    fn test_entity_allow_list() {
        let cert = FieldAllowList::for_entity(find_entity("Cert").unwrap());
        assert!(cert.allows("cryptoAlgorithm"));
        assert!(!cert.allows("email"));
        assert!(!cert.allows("privateKey"));
        assert!(cert.columns().contains(&"bit_size".to_string()));
    }
}
