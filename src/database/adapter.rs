//! Database adapter
//!
//! The [`Adapter`] is the context object the rest of the backend shares: it
//! owns the connection engine together with the settings it was opened
//! with. [`init_adapter`] runs the startup sequence:
//!
//! 1. optionally provision the database (`CREATE DATABASE IF NOT EXISTS`),
//!    logging and continuing on failure
//! 2. open the long-lived engine
//! 3. create every missing catalog table
//!
//! Failures in steps 2 and 3 are returned; no half-initialized adapter is
//! handed out.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::database::catalog::{find_entity, ENTITY_CATALOG};
use crate::database::core::{
    compose_data_source, Connector, DriverKind, Engine, EntityDescriptor, MigrationReport,
    NativeConnector, Row, SchemaMigrator, TableMapper, TableStatus,
};
use crate::database::session::QuerySession;

/// One-shot database creation on a temporary engine
pub struct Provisioner<'a> {
    connector: &'a dyn Connector,
}

impl<'a> Provisioner<'a> {
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    /// Create `db_name` if it does not exist yet
    ///
    /// The temporary engine is opened against `data_source_name` as given,
    /// without the database name, and is closed before returning whether
    /// the statement succeeded or not.
    pub fn create_database(
        &self,
        driver: DriverKind,
        data_source_name: &str,
        db_name: &str,
    ) -> Result<()> {
        let engine = self.connector.connect(driver, data_source_name)?;
        let result = engine.create_database(db_name);

        match (engine.close(), &result) {
            (Err(e), Ok(())) => return Err(anyhow!("Failed to close provisioning engine: {}", e)),
            (Err(e), Err(_)) => warn!("Failed to close provisioning engine: {}", e),
            (Ok(()), _) => {}
        }

        if result.is_ok() {
            info!("Database {} is available", db_name);
        }
        result
    }
}

/// Database adapter holding the live engine
pub struct Adapter {
    data_source_name: String,
    db_name: String,
    driver: DriverKind,
    mapper: TableMapper,
    show_sql: bool,
    connector: Arc<dyn Connector>,
    engine: Option<Box<dyn Engine>>,
}

impl Adapter {
    /// Open an adapter with the built-in engines
    pub fn open(config: &StoreConfig) -> Result<Adapter> {
        Self::open_with(config, Arc::new(NativeConnector))
    }

    /// Open an adapter whose engines come from `connector`
    pub fn open_with(config: &StoreConfig, connector: Arc<dyn Connector>) -> Result<Adapter> {
        let driver: DriverKind = config.driver_name.parse()?;
        let mapper = TableMapper::new(&config.table_name_prefix)?;

        let mut adapter = Adapter {
            data_source_name: config.data_source_name.clone(),
            db_name: config.db_name.clone(),
            driver,
            mapper,
            show_sql: config.show_sql,
            connector,
            engine: None,
        };
        adapter.engine = Some(adapter.connect()?);

        info!(
            "Opened {} database {} (table prefix '{}')",
            adapter.driver,
            adapter.db_name,
            adapter.mapper.prefix()
        );
        Ok(adapter)
    }

    fn connect(&self) -> Result<Box<dyn Engine>> {
        let data_source = compose_data_source(self.driver, &self.data_source_name, &self.db_name);
        let engine = self
            .connector
            .connect(self.driver, &data_source)
            .map_err(|e| anyhow!("Failed to open {} database: {}", self.driver, e))?;
        engine.set_show_sql(self.show_sql);
        Ok(engine)
    }

    /// Replace the engine with a freshly opened one
    ///
    /// The current engine is closed first, so there is never more than one.
    pub fn reopen(&mut self) -> Result<()> {
        self.close()?;
        self.engine = Some(self.connect()?);
        Ok(())
    }

    /// Release the engine; later operations fail until [`Adapter::reopen`]
    pub fn close(&mut self) -> Result<()> {
        match self.engine.take() {
            Some(engine) => engine
                .close()
                .map_err(|e| anyhow!("Failed to close {} database: {}", self.driver, e)),
            None => Ok(()),
        }
    }

    /// Close the engine and consume the adapter
    pub fn shutdown(mut self) -> Result<()> {
        self.close()
    }

    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// The live engine
    pub fn engine(&self) -> Result<&dyn Engine> {
        self.engine
            .as_deref()
            .ok_or_else(|| anyhow!("Adapter is closed"))
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn driver(&self) -> DriverKind {
        self.driver
    }

    pub fn mapper(&self) -> &TableMapper {
        &self.mapper
    }

    /// Table name for an entity under this adapter's prefix
    pub fn table_name(&self, entity: &str) -> String {
        self.mapper.table_name(entity)
    }

    /// Create the configured database through a temporary engine
    pub fn create_database(&self) -> Result<()> {
        Provisioner::new(self.connector.as_ref()).create_database(
            self.driver,
            &self.data_source_name,
            &self.db_name,
        )
    }

    /// Create every missing catalog table
    pub fn migrate(&self) -> Result<MigrationReport> {
        SchemaMigrator::new(self.engine()?, &self.mapper, ENTITY_CATALOG).sync()
    }

    pub fn schema_status(&self) -> Result<Vec<TableStatus>> {
        SchemaMigrator::new(self.engine()?, &self.mapper, ENTITY_CATALOG).status()
    }

    fn entity_table(&self, entity: &str) -> Result<(&'static EntityDescriptor, String)> {
        let descriptor =
            find_entity(entity).ok_or_else(|| anyhow!("Unknown entity '{}'", entity))?;
        Ok((descriptor, self.mapper.table_name(descriptor.name)))
    }

    /// Run `session` against the entity's table
    ///
    /// Filters and sort columns the entity does not have are dropped first,
    /// see [`QuerySession::for_entity`].
    pub fn find(&self, entity: &str, session: &QuerySession) -> Result<Vec<Row>> {
        let (descriptor, table) = self.entity_table(entity)?;
        let query = session.for_entity(descriptor).render(self.driver, &table);
        self.engine()?
            .query(&query.sql, &query.params)
            .map_err(|e| anyhow!("Failed to query table {}: {}", table, e))
    }

    /// Count the rows `session` matches, ignoring its sort and pagination
    pub fn count(&self, entity: &str, session: &QuerySession) -> Result<u64> {
        let (descriptor, table) = self.entity_table(entity)?;
        let query = session
            .for_entity(descriptor)
            .render_count(self.driver, &table);
        let rows = self
            .engine()?
            .query(&query.sql, &query.params)
            .map_err(|e| anyhow!("Failed to count rows in table {}: {}", table, e))?;

        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("Count query on table {} returned no count", table))
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            warn!("Adapter dropped without shutdown, closing {} database", self.driver);
            if let Err(e) = engine.close() {
                warn!("Failed to close {} database: {}", self.driver, e);
            }
        }
    }
}

/// Provision, open and migrate with the built-in engines
pub fn init_adapter(
    config: &StoreConfig,
    create_database: bool,
) -> Result<(Adapter, MigrationReport)> {
    init_adapter_with(config, create_database, Arc::new(NativeConnector))
}

/// Provision, open and migrate with engines from `connector`
pub fn init_adapter_with(
    config: &StoreConfig,
    create_database: bool,
    connector: Arc<dyn Connector>,
) -> Result<(Adapter, MigrationReport)> {
    if create_database {
        let driver: DriverKind = config.driver_name.parse()?;
        if let Err(e) = Provisioner::new(connector.as_ref()).create_database(
            driver,
            &config.data_source_name,
            &config.db_name,
        ) {
            warn!("Failed to create database {}: {}", config.db_name, e);
        }
    }

    let adapter = Adapter::open_with(config, connector)?;
    match adapter.migrate() {
        Ok(report) => Ok((adapter, report)),
        Err(e) => {
            if let Err(close_err) = adapter.shutdown() {
                warn!("{}", close_err);
            }
            Err(e)
        }
    }
}
