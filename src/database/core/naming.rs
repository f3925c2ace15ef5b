//! Table and column naming
//!
//! Entity names (`VerificationRecord`) and caller-facing field names
//! (`displayName`) are mapped to snake-case identifiers. Table names get an
//! optional prefix on top. The migrator and the session builder both go
//! through this module, so a column created by the one is the column the
//! other filters and sorts on.

use anyhow::{anyhow, Result};

/// Convert a camel-case or Pascal-case name to snake case.
///
/// An underscore is inserted before an upper-case letter only once a
/// non-underscore character has been seen, so leading underscores and
/// already-snake names pass through unchanged.
///
/// ```
/// use iam_store::database::snake_string;
///
/// assert_eq!(snake_string("VerificationRecord"), "verification_record");
/// assert_eq!(snake_string("createdTime"), "created_time");
/// assert_eq!(snake_string("created_time"), "created_time");
/// ```
pub fn snake_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    let mut seen_word = false;

    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() && seen_word {
            out.push('_');
        }
        if c != '_' {
            seen_word = true;
        }
        out.push(c);
    }

    out.to_lowercase()
}

/// Whether `s` only contains ASCII letters, digits and underscores
pub fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Maps entity names to table names: `prefix + snake_string(entity)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMapper {
    prefix: String,
}

impl TableMapper {
    /// Create a mapper with the given table prefix (may be empty)
    ///
    /// The prefix ends up inside DDL and query text, so it is restricted to
    /// ASCII letters, digits and underscores.
    pub fn new(prefix: &str) -> Result<Self> {
        if !prefix.is_empty() && !is_plain_identifier(prefix) {
            return Err(anyhow!(
                "Invalid table name prefix '{}': only ASCII letters, digits and '_' are allowed",
                prefix
            ));
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Table name for an entity
    pub fn table_name(&self, entity: &str) -> String {
        format!("{}{}", self.prefix, snake_string(entity))
    }
}
