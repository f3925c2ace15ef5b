//! SQLite connection engine
//!
//! This module provides the engine compiled into the crate: a single
//! rusqlite connection guarded by a mutex.

use anyhow::{anyhow, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::engine::{DriverKind, Engine, Row, SqlValue};

/// Data source that selects an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// SQLite engine
///
/// `SqliteEngine` wraps one SQLite connection. Both file-based and
/// in-memory databases get the same pragmas; access from concurrent callers
/// is serialized on the inner mutex.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    show_sql: AtomicBool,
}

impl SqliteEngine {
    /// Open the database named by `data_source`, creating the file if needed
    ///
    /// `:memory:` (or an empty string) opens an in-memory database.
    pub fn open(data_source: &str) -> Result<Self> {
        let in_memory = data_source.is_empty() || data_source == IN_MEMORY;
        let conn = if in_memory {
            Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?
        } else {
            Connection::open(data_source)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", data_source, e))?
        };

        configure(&conn, in_memory)?;

        Ok(Self {
            conn: Mutex::new(conn),
            show_sql: AtomicBool::new(false),
        })
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(IN_MEMORY)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("SQLite connection lock poisoned: {}", e))
    }

    fn log_sql(&self, sql: &str, params: &[SqlValue]) {
        if self.show_sql.load(Ordering::Relaxed) {
            if params.is_empty() {
                info!("[SQL] {}", sql.trim());
            } else {
                info!("[SQL] {} {:?}", sql.trim(), params);
            }
        }
    }
}

/// Apply connection settings
fn configure(conn: &Connection, in_memory: bool) -> Result<()> {
    // WAL has no meaning for in-memory databases
    if !in_memory {
        let _: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;
    }

    conn.execute("PRAGMA synchronous=NORMAL", [])
        .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

    conn.execute("PRAGMA foreign_keys=ON", [])
        .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

    Ok(())
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(v) => serde_json::Value::from(v),
        ValueRef::Real(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Blob(bytes) => serde_json::Value::from(bytes.to_vec()),
    }
}

impl Engine for SqliteEngine {
    fn driver(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.log_sql(sql, params);
        let conn = self.lock()?;
        conn.execute(sql, params_from_iter(params.iter()))
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.log_sql(sql, params);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| anyhow!("Failed to read row: {}", e))?
        {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| anyhow!("Failed to read column '{}': {}", name, e))?;
                record.insert(name.clone(), value_to_json(value));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        const SQL: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1";
        self.log_sql(SQL, &[SqlValue::from(table)]);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(SQL, [table], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    fn create_database(&self, db_name: &str) -> Result<()> {
        // The database file is created when the engine is opened
        debug!(
            "SQLite database '{}' already exists as the opened file",
            db_name
        );
        Ok(())
    }

    fn set_show_sql(&self, show: bool) {
        self.show_sql.store(show, Ordering::Relaxed);
    }

    fn close(self: Box<Self>) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| anyhow!("SQLite connection lock poisoned: {}", e))?;
        conn.close()
            .map_err(|(_, e)| anyhow!("Failed to close SQLite database: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let engine = SqliteEngine::open_in_memory();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iam.sqlite3");
        let path_str = path.to_str().unwrap();

        let engine = SqliteEngine::open(path_str).unwrap();
        engine
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        Box::new(engine).close().unwrap();

        assert!(path.exists());
        let reopened = SqliteEngine::open(path_str).unwrap();
        assert!(reopened.table_exists("t").unwrap());
    }

    #[test]
    fn test_table_exists() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY)", &[])
            .unwrap();

        assert!(engine.table_exists("test_table").unwrap());
        assert!(!engine.table_exists("nonexistent_table").unwrap());
    }

    #[test]
    fn test_query_with_params() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE user (owner TEXT, name TEXT, score INTEGER)", &[])
            .unwrap();
        engine
            .execute(
                "INSERT INTO user (owner, name, score) VALUES (?, ?, ?)",
                &["acme".into(), "alice".into(), 7i64.into()],
            )
            .unwrap();
        engine
            .execute(
                "INSERT INTO user (owner, name, score) VALUES (?, ?, ?)",
                &["other".into(), "bob".into(), SqlValue::Null],
            )
            .unwrap();

        let rows = engine
            .query("SELECT * FROM user WHERE owner = ?", &["acme".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], serde_json::json!("alice"));
        assert_eq!(rows[0]["score"], serde_json::json!(7));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_show_sql_logs_statements() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let engine = SqliteEngine::open_in_memory().unwrap();
            engine
                .execute("CREATE TABLE quiet (id INTEGER PRIMARY KEY)", &[])
                .unwrap();

            engine.set_show_sql(true);
            engine
                .execute("CREATE TABLE loud (id INTEGER PRIMARY KEY)", &[])
                .unwrap();
            assert!(engine.table_exists("loud").unwrap());
            engine
                .query("SELECT * FROM loud WHERE id = ?", &[1i64.into()])
                .unwrap();
        });

        let text = logs.text();
        assert!(!text.contains("quiet"));
        assert!(text.contains("[SQL] CREATE TABLE loud"));
        assert!(text.contains("[SQL] SELECT COUNT(*) FROM sqlite_master"));
        assert!(text.contains("Text(\"loud\")"));
        assert!(text.contains("[SQL] SELECT * FROM loud WHERE id = ? [Integer(1)]"));
    }

    #[test]
    fn test_create_database_is_noop() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        assert!(engine.create_database("iam").is_ok());
        assert!(engine.create_database("iam").is_ok());
    }

    #[test]
    fn test_execute_error_is_reported() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        assert!(engine.execute("NOT VALID SQL", &[]).is_err());
    }
}
