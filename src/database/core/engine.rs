//! Connection engine abstraction
//!
//! An [`Engine`] is a live handle to the relational database. The adapter
//! owns exactly one; the provisioner opens a short-lived one of its own.
//! Engines are produced by a [`Connector`], which is the seam where a
//! substitute engine is plugged in for tests or for driver families that
//! are not built into this crate.

use anyhow::{anyhow, Result};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::connection::SqliteEngine;
use super::schema::ColumnType;

/// A row returned by [`Engine::query`], keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Supported driver families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Mysql,
    Postgres,
    Mssql,
    Sqlite,
}

impl FromStr for DriverKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(DriverKind::Mysql),
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "mssql" | "sqlserver" => Ok(DriverKind::Mssql),
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            _ => Err(anyhow!("Unknown database driver '{}'", s)),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgres",
            DriverKind::Mssql => "mssql",
            DriverKind::Sqlite => "sqlite",
        };
        write!(f, "{}", name)
    }
}

impl DriverKind {
    /// Whether the database name is appended to the data source on open
    ///
    /// Only the MySQL family takes a server-level data source
    /// (`user:pass@tcp(host:3306)/`) followed by the database name. Other
    /// drivers carry the database inside their connection string already.
    pub fn appends_db_name(&self) -> bool {
        matches!(self, DriverKind::Mysql)
    }

    /// Quote an identifier for this dialect
    pub fn quote(&self, ident: &str) -> String {
        match self {
            DriverKind::Mysql => format!("`{}`", ident),
            DriverKind::Mssql => format!("[{}]", ident),
            DriverKind::Postgres | DriverKind::Sqlite => format!("\"{}\"", ident),
        }
    }

    /// Placeholder for the `n`-th (1-based) bound parameter
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            DriverKind::Postgres => format!("${}", n),
            DriverKind::Mssql => format!("@P{}", n),
            DriverKind::Mysql | DriverKind::Sqlite => "?".to_string(),
        }
    }

    /// Column type for this dialect
    pub fn sql_type(&self, ty: ColumnType) -> String {
        match (self, ty) {
            (DriverKind::Sqlite, ColumnType::Varchar(_) | ColumnType::Text) => "TEXT".to_string(),
            (DriverKind::Sqlite, ColumnType::Integer | ColumnType::Boolean) => {
                "INTEGER".to_string()
            }
            (DriverKind::Sqlite, ColumnType::Real) => "REAL".to_string(),

            (DriverKind::Mysql, ColumnType::Varchar(n)) => format!("VARCHAR({})", n),
            (DriverKind::Mysql, ColumnType::Text) => "MEDIUMTEXT".to_string(),
            (DriverKind::Mysql, ColumnType::Integer) => "BIGINT".to_string(),
            (DriverKind::Mysql, ColumnType::Real) => "DOUBLE".to_string(),
            (DriverKind::Mysql, ColumnType::Boolean) => "TINYINT(1)".to_string(),

            (DriverKind::Postgres, ColumnType::Varchar(n)) => format!("VARCHAR({})", n),
            (DriverKind::Postgres, ColumnType::Text) => "TEXT".to_string(),
            (DriverKind::Postgres, ColumnType::Integer) => "BIGINT".to_string(),
            (DriverKind::Postgres, ColumnType::Real) => "DOUBLE PRECISION".to_string(),
            (DriverKind::Postgres, ColumnType::Boolean) => "BOOLEAN".to_string(),

            (DriverKind::Mssql, ColumnType::Varchar(n)) => format!("NVARCHAR({})", n),
            (DriverKind::Mssql, ColumnType::Text) => "NVARCHAR(MAX)".to_string(),
            (DriverKind::Mssql, ColumnType::Integer) => "BIGINT".to_string(),
            (DriverKind::Mssql, ColumnType::Real) => "FLOAT".to_string(),
            (DriverKind::Mssql, ColumnType::Boolean) => "BIT".to_string(),
        }
    }
}

/// Build the data source the long-lived engine is opened with
pub fn compose_data_source(driver: DriverKind, data_source_name: &str, db_name: &str) -> String {
    if driver.appends_db_name() {
        format!("{}{}", data_source_name, db_name)
    } else {
        data_source_name.to_string()
    }
}

/// The statement issued by the provisioner, verbatim
pub fn create_database_sql(db_name: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARSET utf8mb4 COLLATE utf8mb4_general_ci",
        db_name
    )
}

/// A bound query parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Real(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A live database handle
///
/// Implementations handle their own locking: one engine is shared by every
/// concurrent caller of the adapter.
pub trait Engine: Send + Sync {
    /// Driver family, used to pick the SQL dialect
    fn driver(&self) -> DriverKind;

    /// Execute a statement, returning the number of affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Run a query and collect all rows
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Check whether a table exists
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Create a database if it does not exist yet
    fn create_database(&self, db_name: &str) -> Result<()> {
        self.execute(&create_database_sql(db_name), &[]).map(|_| ())
    }

    /// Log every executed statement when enabled
    fn set_show_sql(&self, show: bool);

    /// Release the handle
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens engines for a driver family
pub trait Connector: Send + Sync {
    fn connect(&self, driver: DriverKind, data_source: &str) -> Result<Box<dyn Engine>>;
}

/// Connector for the engines compiled into this crate
///
/// Only SQLite is built in. MySQL, PostgreSQL and MSSQL deployments supply
/// their own [`Connector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConnector;

impl Connector for NativeConnector {
    fn connect(&self, driver: DriverKind, data_source: &str) -> Result<Box<dyn Engine>> {
        match driver {
            DriverKind::Sqlite => Ok(Box::new(SqliteEngine::open(data_source)?)),
            other => Err(anyhow!(
                "No built-in engine for driver '{}'; supply a Connector for it",
                other
            )),
        }
    }
}
