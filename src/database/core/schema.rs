//! Database schema management
//!
//! This module turns entity descriptors into DDL and keeps the schema in
//! place: every entity of the catalog gets its table created when it is
//! missing. Existing tables are left exactly as they are; evolving them is
//! the job of an external migration step.

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::info;

use super::engine::{DriverKind, Engine};
use super::naming::{snake_string, TableMapper};

/// Column types understood by the DDL renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Bounded string, `VARCHAR(n)` where the dialect has it
    Varchar(u16),
    /// Unbounded string
    Text,
    Integer,
    Real,
    Boolean,
}

/// One column of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field name as callers know it (`displayName`)
    pub field: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub indexed: bool,
    /// Whether the column may be used as a dynamic filter target
    pub queryable: bool,
}

impl ColumnDef {
    pub const fn new(field: &'static str, ty: ColumnType) -> Self {
        Self {
            field,
            ty,
            primary_key: false,
            indexed: false,
            queryable: true,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Exclude the column from dynamic filtering
    pub const fn secret(mut self) -> Self {
        self.queryable = false;
        self
    }

    /// Column name in the database
    pub fn column_name(&self) -> String {
        snake_string(self.field)
    }
}

/// Static description of one persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity name in Pascal case (`VerificationRecord`)
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl EntityDescriptor {
    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        let column = snake_string(field);
        self.columns.iter().find(|c| c.column_name() == column)
    }
}

/// DDL rendering for entity descriptors
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// `CREATE TABLE` statement for an entity
    pub fn create_table(driver: DriverKind, table: &str, entity: &EntityDescriptor) -> String {
        let mut defs: Vec<String> = entity
            .columns
            .iter()
            .map(|c| {
                let mut def = format!(
                    "{} {}",
                    driver.quote(&c.column_name()),
                    driver.sql_type(c.ty)
                );
                if c.primary_key {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();

        let keys: Vec<String> = entity
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| driver.quote(&c.column_name()))
            .collect();
        if !keys.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TABLE {} ({})",
            driver.quote(table),
            defs.join(", ")
        )
    }

    /// `CREATE INDEX` statements for the indexed columns of an entity
    pub fn create_indexes(driver: DriverKind, table: &str, entity: &EntityDescriptor) -> Vec<String> {
        entity
            .columns
            .iter()
            .filter(|c| c.indexed)
            .map(|c| {
                let column = c.column_name();
                format!(
                    "CREATE INDEX {} ON {} ({})",
                    driver.quote(&format!("IDX_{}_{}", table, column)),
                    driver.quote(table),
                    driver.quote(&column)
                )
            })
            .collect()
    }

    /// All statements needed to create an entity's table
    pub fn create_statements(
        driver: DriverKind,
        table: &str,
        entity: &EntityDescriptor,
    ) -> Vec<String> {
        let mut statements = vec![Self::create_table(driver, table, entity)];
        statements.extend(Self::create_indexes(driver, table, entity));
        statements
    }
}

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Tables created by this run, in catalog order
    pub created: Vec<String>,
    /// Tables that were already present and left untouched
    pub existing: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Existence of one entity's table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStatus {
    pub entity: String,
    pub table: String,
    pub exists: bool,
}

/// Schema migrator
///
/// Walks the entity catalog in order and creates each missing table. Any
/// failure, whether checking for a table or creating it, stops the run at
/// that entity and is returned to the caller; the adapter treats it as
/// fatal.
pub struct SchemaMigrator<'a> {
    engine: &'a dyn Engine,
    mapper: &'a TableMapper,
    catalog: &'a [EntityDescriptor],
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(
        engine: &'a dyn Engine,
        mapper: &'a TableMapper,
        catalog: &'a [EntityDescriptor],
    ) -> Self {
        Self {
            engine,
            mapper,
            catalog,
        }
    }

    /// Create every missing table
    pub fn sync(&self) -> Result<MigrationReport> {
        let driver = self.engine.driver();
        let mut report = MigrationReport::default();

        for entity in self.catalog {
            let table = self.mapper.table_name(entity.name);

            let exists = self.engine.table_exists(&table).map_err(|e| {
                anyhow!("Failed to check whether table {} exists: {}", table, e)
            })?;
            if exists {
                report.existing.push(table);
                continue;
            }

            for statement in SchemaDefinitions::create_statements(driver, &table, entity) {
                self.engine
                    .execute(&statement, &[])
                    .map_err(|e| anyhow!("Failed to create table {}: {}", table, e))?;
            }
            info!("Created table {} for entity {}", table, entity.name);
            report.created.push(table);
        }

        info!(
            "Schema sync finished: {} created, {} already present",
            report.created.len(),
            report.existing.len()
        );
        Ok(report)
    }

    /// Report which tables exist, without issuing any DDL
    pub fn status(&self) -> Result<Vec<TableStatus>> {
        self.catalog
            .iter()
            .map(|entity| {
                let table = self.mapper.table_name(entity.name);
                let exists = self.engine.table_exists(&table).map_err(|e| {
                    anyhow!("Failed to check whether table {} exists: {}", table, e)
                })?;
                Ok(TableStatus {
                    entity: entity.name.to_string(),
                    table,
                    exists,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::catalog::ENTITY_CATALOG;
    use crate::database::core::connection::SqliteEngine;
    use crate::database::core::testing::RecordingEngine;

    const WIDGET_COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("owner", ColumnType::Varchar(100)).primary_key(),
        ColumnDef::new("name", ColumnType::Varchar(100)).primary_key(),
        ColumnDef::new("createdTime", ColumnType::Varchar(100)),
        ColumnDef::new("serialNo", ColumnType::Varchar(50)).indexed(),
        ColumnDef::new("weight", ColumnType::Real),
    ];

    const WIDGET: EntityDescriptor = EntityDescriptor {
        name: "FancyWidget",
        columns: WIDGET_COLUMNS,
    };

    #[test]
    fn test_create_table_sqlite() {
        let sql = SchemaDefinitions::create_table(DriverKind::Sqlite, "fancy_widget", &WIDGET);
        assert_eq!(
            sql,
            "CREATE TABLE \"fancy_widget\" (\"owner\" TEXT NOT NULL, \"name\" TEXT NOT NULL, \
             \"created_time\" TEXT, \"serial_no\" TEXT, \"weight\" REAL, \
             PRIMARY KEY (\"owner\", \"name\"))"
        );
    }

    #[test]
    fn test_create_table_mysql() {
        let sql = SchemaDefinitions::create_table(DriverKind::Mysql, "cd_fancy_widget", &WIDGET);
        assert!(sql.starts_with("CREATE TABLE `cd_fancy_widget` (`owner` VARCHAR(100) NOT NULL"));
        assert!(sql.contains("`serial_no` VARCHAR(50)"));
        assert!(sql.contains("`weight` DOUBLE"));
        assert!(sql.ends_with("PRIMARY KEY (`owner`, `name`))"));
    }

    #[test]
    fn test_create_indexes() {
        let indexes = SchemaDefinitions::create_indexes(DriverKind::Sqlite, "fancy_widget", &WIDGET);
        assert_eq!(
            indexes,
            vec![
                "CREATE INDEX \"IDX_fancy_widget_serial_no\" ON \"fancy_widget\" (\"serial_no\")"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_entity_column_lookup() {
        assert!(WIDGET.column("serialNo").is_some());
        assert!(WIDGET.column("serial_no").is_some());
        assert!(WIDGET.column("color").is_none());
    }

    #[test]
    fn test_sync_creates_all_tables() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let mapper = TableMapper::default();
        let migrator = SchemaMigrator::new(&engine, &mapper, ENTITY_CATALOG);

        let report = migrator.sync().unwrap();
        assert_eq!(report.created.len(), ENTITY_CATALOG.len());
        assert!(report.existing.is_empty());

        for entity in ENTITY_CATALOG {
            assert!(engine.table_exists(&mapper.table_name(entity.name)).unwrap());
        }
        assert!(migrator.status().unwrap().iter().all(|s| s.exists));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let engine = RecordingEngine::new(DriverKind::Mysql);
        let mapper = TableMapper::default();
        let migrator = SchemaMigrator::new(&engine, &mapper, ENTITY_CATALOG);

        migrator.sync().unwrap();
        let ddl_after_first = engine.statements().len();
        assert!(ddl_after_first >= ENTITY_CATALOG.len());

        let second = migrator.sync().unwrap();
        assert!(second.is_noop());
        assert_eq!(second.existing.len(), ENTITY_CATALOG.len());
        assert_eq!(engine.statements().len(), ddl_after_first);
    }

    #[test]
    fn test_sync_leaves_existing_tables_alone() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE \"user\" (legacy TEXT)", &[])
            .unwrap();
        let mapper = TableMapper::default();
        let migrator = SchemaMigrator::new(&engine, &mapper, ENTITY_CATALOG);

        let report = migrator.sync().unwrap();
        assert!(report.existing.contains(&"user".to_string()));
        assert!(!report.created.contains(&"user".to_string()));

        // the old shape is still there
        let rows = engine.query("SELECT legacy FROM \"user\"", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sync_prefix_does_not_rename() {
        let engine = SqliteEngine::open_in_memory().unwrap();

        let cd = TableMapper::new("cd_").unwrap();
        let report = SchemaMigrator::new(&engine, &cd, ENTITY_CATALOG)
            .sync()
            .unwrap();
        assert!(report.created.iter().all(|t| t.starts_with("cd_")));
        assert!(report
            .created
            .contains(&"cd_verification_record".to_string()));

        let xx = TableMapper::new("xx_").unwrap();
        let report = SchemaMigrator::new(&engine, &xx, ENTITY_CATALOG)
            .sync()
            .unwrap();
        assert_eq!(report.created.len(), ENTITY_CATALOG.len());

        // the cd_ tables were not renamed
        assert!(engine.table_exists("cd_user").unwrap());
        assert!(engine.table_exists("xx_user").unwrap());
    }

    #[test]
    fn test_sync_stops_on_existence_check_failure() {
        let engine = RecordingEngine::new(DriverKind::Sqlite);
        engine.fail_table_exists("role");
        let mapper = TableMapper::default();
        let migrator = SchemaMigrator::new(&engine, &mapper, ENTITY_CATALOG);

        let err = migrator.sync().unwrap_err();
        assert!(err.to_string().contains("role"));

        // organization and user come before role in the catalog
        assert!(engine.has_table("organization"));
        assert!(engine.has_table("user"));
        assert!(!engine.has_table("permission"));
    }

    #[test]
    fn test_sync_stops_on_create_failure() {
        let engine = RecordingEngine::new(DriverKind::Sqlite);
        engine.fail_create("user");
        let mapper = TableMapper::default();
        let migrator = SchemaMigrator::new(&engine, &mapper, ENTITY_CATALOG);

        let err = migrator.sync().unwrap_err();
        assert!(err.to_string().contains("Failed to create table user"));
        assert!(engine.has_table("organization"));
        assert!(!engine.has_table("role"));
    }
}
