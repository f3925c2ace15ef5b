//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `Engine` / `Connector`: the live database handle and how it is opened
//! - `SqliteEngine`: the engine compiled into the crate
//! - `SchemaMigrator`: creation of missing tables from entity descriptors
//! - `TableMapper`: table and column naming

mod connection;
mod engine;
mod naming;
mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{SqliteEngine, IN_MEMORY};
pub use engine::{
    compose_data_source, create_database_sql, Connector, DriverKind, Engine, NativeConnector, Row,
    SqlValue,
};
pub use naming::{is_plain_identifier, snake_string, TableMapper};
pub use schema::{
    ColumnDef, ColumnType, EntityDescriptor, MigrationReport, SchemaDefinitions, SchemaMigrator,
    TableStatus,
};
