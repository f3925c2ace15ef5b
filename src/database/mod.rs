//! Database module
//!
//! This module provides all database functionality for iam-store, organized into:
//!
//! - **core**: Core database infrastructure (engines, dialects, schema management)
//! - **catalog**: The fixed list of persisted entities
//! - **session**: Query sessions built from request parameters
//! - **adapter**: The adapter context object and the startup sequence
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── engine      # Engine/Connector traits, driver dialects
//! │   ├── connection  # SQLite engine
//! │   ├── naming      # snake_case mapping and table prefix
//! │   └── schema      # DDL rendering and the schema migrator
//! │
//! ├── catalog         # Entity descriptors
//! ├── session/        # Query session builder
//! │   └── allow_list  # Filterable columns
//! └── adapter         # Adapter, Provisioner, init_adapter
//! ```
//!
//! # Driver Strategy
//!
//! SQLite is compiled in. MySQL, PostgreSQL and MSSQL deployments provide a
//! [`Connector`] that opens an [`Engine`] for their driver; everything above
//! the engine (naming, DDL, sessions, pagination syntax) is dialect-aware.
//!
//! # Usage
//!
//! ```rust,ignore
//! use iam_store::config::StoreConfig;
//! use iam_store::database::{build_session, init_adapter};
//!
//! let config = StoreConfig::new(&None)?;
//! let (adapter, report) = init_adapter(&config, true)?;
//! println!("created {} tables", report.created.len());
//!
//! let session = build_session("built-in", 0, 10, "displayName", "ali", "", "");
//! let users = adapter.find("User", &session)?;
//!
//! adapter.shutdown()?;
//! ```

mod adapter;
pub mod catalog;
pub mod core;
pub mod session;

pub use adapter::{init_adapter, init_adapter_with, Adapter, Provisioner};

pub use catalog::{find_entity, ENTITY_CATALOG};

pub use core::{
    compose_data_source, create_database_sql, is_plain_identifier, snake_string, ColumnDef,
    ColumnType, Connector, DriverKind, Engine, EntityDescriptor, MigrationReport,
    NativeConnector, Row, SchemaDefinitions, SchemaMigrator, SqlValue, SqliteEngine, TableMapper,
    TableStatus, IN_MEMORY,
};

pub use session::{
    build_session, filter_field, Condition, FieldAllowList, OrderBy, Pagination, QuerySession,
    RenderedQuery, SessionBuilder, SortDirection,
};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let nested = nested.to_str().unwrap();

        ensure_data_dir(nested).unwrap();
        ensure_data_dir(nested).unwrap();
        assert!(std::path::Path::new(nested).is_dir());

        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        let err = ensure_data_dir(file.join("sub").to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Failed to create data directory"));
    }
}
