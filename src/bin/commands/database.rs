use anyhow::Result;
use iam_store::database::{
    init_adapter, Adapter, DriverKind, MigrationReport, NativeConnector, Provisioner,
};
use iam_store::StoreConfig;
use serde::Serialize;
use tabled::{Table, Tabled};

use super::{print_json, styled, OutputFormat};

#[derive(Tabled, Serialize)]
struct MigrationRow {
    table: String,
    action: &'static str,
}

#[derive(Tabled, Serialize)]
struct StatusRow {
    entity: String,
    table: String,
    status: &'static str,
}

#[derive(Serialize)]
struct ProvisionResult {
    driver: String,
    db_name: String,
    available: bool,
}

/// Provision (unless skipped), open and migrate
pub fn run_init(config: &StoreConfig, skip_create_database: bool, output_format: OutputFormat) -> Result<()> {
    let (adapter, report) = init_adapter(config, !skip_create_database)?;
    adapter.shutdown()?;
    print_report(&report, output_format)
}

/// Issue `CREATE DATABASE IF NOT EXISTS` only
pub fn run_create_database(config: &StoreConfig, output_format: OutputFormat) -> Result<()> {
    let driver: DriverKind = config.driver_name.parse()?;
    Provisioner::new(&NativeConnector).create_database(
        driver,
        &config.data_source_name,
        &config.db_name,
    )?;

    let result = ProvisionResult {
        driver: driver.to_string(),
        db_name: config.db_name.clone(),
        available: true,
    };
    if output_format.is_json() {
        return print_json(&result, output_format);
    }
    println!("Database {} is available ({})", result.db_name, result.driver);
    Ok(())
}

/// Create missing tables without provisioning
pub fn run_migrate(config: &StoreConfig, output_format: OutputFormat) -> Result<()> {
    let adapter = Adapter::open(config)?;
    let result = adapter.migrate();
    let closed = adapter.shutdown();
    let report = result?;
    closed?;
    print_report(&report, output_format)
}

/// Show which catalog tables exist
pub fn run_status(config: &StoreConfig, output_format: OutputFormat) -> Result<()> {
    let adapter = Adapter::open(config)?;
    let header = format!(
        "{} database {}, table prefix '{}'",
        adapter.driver(),
        adapter.db_name(),
        adapter.mapper().prefix()
    );
    let result = adapter.schema_status();
    let closed = adapter.shutdown();
    let status = result?;
    closed?;

    if output_format.is_json() {
        return print_json(&status, output_format);
    }

    let missing = status.iter().filter(|s| !s.exists).count();
    let rows: Vec<StatusRow> = status
        .into_iter()
        .map(|s| StatusRow {
            entity: s.entity,
            table: s.table,
            status: if s.exists { "present" } else { "missing" },
        })
        .collect();

    println!("{}", header);
    println!("{}", styled(Table::new(rows), output_format));
    if missing > 0 {
        println!("{} table(s) missing; run `iam-store migrate` to create them", missing);
    }
    Ok(())
}

fn print_report(report: &MigrationReport, output_format: OutputFormat) -> Result<()> {
    if output_format.is_json() {
        return print_json(report, output_format);
    }

    let rows: Vec<MigrationRow> = report
        .created
        .iter()
        .map(|t| MigrationRow {
            table: t.clone(),
            action: "created",
        })
        .chain(report.existing.iter().map(|t| MigrationRow {
            table: t.clone(),
            action: "existing",
        }))
        .collect();

    println!("{}", styled(Table::new(rows), output_format));
    println!(
        "{} table(s) created, {} already present",
        report.created.len(),
        report.existing.len()
    );
    Ok(())
}
