#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! iam-store - database access for a multi-tenant identity backend
//!
//! iam-store owns everything between the identity backend's repositories and
//! the relational database: opening the connection, creating the database,
//! creating missing tables for the entity catalog, and building the paged,
//! filtered and sorted read queries the web layer asks for. It can be used as
//! a library and as an operator command-line tool.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | The `iam-store` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! iam-store = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! iam-store = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: All database functionality
//!   - `core`: engines, driver dialects, naming and the schema migrator
//!   - `catalog`: the persisted entities and their columns
//!   - `session`: query sessions and the filter allow-list
//!   - `Adapter`, `Provisioner` and `init_adapter`: the startup sequence
//!
//! - **[`config`]**: Configuration management
//!
//! # Quick Start
//!
//! ```rust
//! use iam_store::database::{build_session, init_adapter};
//! use iam_store::StoreConfig;
//!
//! let (adapter, report) = init_adapter(&StoreConfig::in_memory(), true).unwrap();
//! assert!(!report.created.is_empty());
//!
//! let session = build_session("built-in", 0, 10, "displayName", "admin", "", "");
//! let users = adapter.find("User", &session).unwrap();
//! assert!(users.is_empty());
//!
//! adapter.shutdown().unwrap();
//! ```
//!
//! # Drivers
//!
//! SQLite is compiled in. For MySQL, PostgreSQL or MSSQL, implement
//! [`database::Connector`] over the client of your choice and pass it to
//! [`database::init_adapter_with`].

pub mod config;
pub mod database;

// =============================================================================
// Configuration
// =============================================================================

pub use config::StoreConfig;

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

pub use database::{init_adapter, init_adapter_with, Adapter, Provisioner};

pub use database::{Connector, DriverKind, Engine, NativeConnector, SqliteEngine};

pub use database::{
    build_session, FieldAllowList, MigrationReport, QuerySession, SessionBuilder, TableStatus,
};
