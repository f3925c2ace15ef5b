//! In-process fake engine for tests
//!
//! `RecordingEngine` keeps every statement it is asked to run, tracks which
//! tables exist, and can be told to fail specific operations.
//! `RecordingConnector` hands out engines that share one recording, so a
//! test can see both the provisioner's temporary engine and the adapter's
//! long-lived one.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::engine::{Connector, DriverKind, Engine, Row, SqlValue};

#[derive(Default)]
struct Recording {
    statements: Vec<String>,
    queries: Vec<(String, Vec<SqlValue>)>,
    tables: HashSet<String>,
    fail_exists: HashSet<String>,
    fail_create: HashSet<String>,
    fail_prefixes: Vec<String>,
    fail_connect: bool,
    connects: Vec<(DriverKind, String)>,
    closes: usize,
    events: Vec<String>,
    show_sql: bool,
    rows: Vec<Row>,
}

fn created_table(statement: &str) -> Option<String> {
    let rest = statement.strip_prefix("CREATE TABLE ")?;
    let name = rest.split_whitespace().next()?;
    Some(name.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']').to_string())
}

#[derive(Clone)]
pub(crate) struct RecordingEngine {
    driver: DriverKind,
    recording: Arc<Mutex<Recording>>,
}

impl RecordingEngine {
    pub(crate) fn new(driver: DriverKind) -> Self {
        Self {
            driver,
            recording: Arc::new(Mutex::new(Recording::default())),
        }
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.recording.lock().unwrap().statements.clone()
    }

    pub(crate) fn queries(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.recording.lock().unwrap().queries.clone()
    }

    pub(crate) fn has_table(&self, table: &str) -> bool {
        self.recording.lock().unwrap().tables.contains(table)
    }

    pub(crate) fn closes(&self) -> usize {
        self.recording.lock().unwrap().closes
    }

    pub(crate) fn connects(&self) -> Vec<(DriverKind, String)> {
        self.recording.lock().unwrap().connects.clone()
    }

    /// Connects and closes in the order they happened
    pub(crate) fn events(&self) -> Vec<String> {
        self.recording.lock().unwrap().events.clone()
    }

    pub(crate) fn show_sql(&self) -> bool {
        self.recording.lock().unwrap().show_sql
    }

    pub(crate) fn add_table(&self, table: &str) {
        self.recording.lock().unwrap().tables.insert(table.to_string());
    }

    pub(crate) fn set_rows(&self, rows: Vec<Row>) {
        self.recording.lock().unwrap().rows = rows;
    }

    pub(crate) fn fail_table_exists(&self, table: &str) {
        self.recording
            .lock()
            .unwrap()
            .fail_exists
            .insert(table.to_string());
    }

    pub(crate) fn fail_create(&self, table: &str) {
        self.recording
            .lock()
            .unwrap()
            .fail_create
            .insert(table.to_string());
    }

    /// Fail every statement starting with `prefix`
    pub(crate) fn fail_statements(&self, prefix: &str) {
        self.recording
            .lock()
            .unwrap()
            .fail_prefixes
            .push(prefix.to_string());
    }
}

impl Engine for RecordingEngine {
    fn driver(&self) -> DriverKind {
        self.driver
    }

    fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<usize> {
        let mut rec = self.recording.lock().unwrap();
        rec.statements.push(sql.to_string());

        if rec.fail_prefixes.iter().any(|p| sql.starts_with(p.as_str())) {
            return Err(anyhow!("injected failure for: {}", sql));
        }
        if let Some(table) = created_table(sql) {
            if rec.fail_create.contains(&table) {
                return Err(anyhow!("injected create failure for {}", table));
            }
            rec.tables.insert(table);
        }
        Ok(0)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut rec = self.recording.lock().unwrap();
        rec.queries.push((sql.to_string(), params.to_vec()));
        Ok(rec.rows.clone())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let rec = self.recording.lock().unwrap();
        if rec.fail_exists.contains(table) {
            return Err(anyhow!("injected existence check failure for {}", table));
        }
        Ok(rec.tables.contains(table))
    }

    fn set_show_sql(&self, show: bool) {
        self.recording.lock().unwrap().show_sql = show;
    }

    fn close(self: Box<Self>) -> Result<()> {
        let mut rec = self.recording.lock().unwrap();
        rec.closes += 1;
        rec.events.push("close".to_string());
        Ok(())
    }
}

/// Connector producing [`RecordingEngine`]s over one shared recording
#[derive(Clone)]
pub(crate) struct RecordingConnector {
    view: RecordingEngine,
}

impl RecordingConnector {
    pub(crate) fn new(driver: DriverKind) -> Self {
        Self {
            view: RecordingEngine::new(driver),
        }
    }

    /// Handle for inspecting and steering the shared recording
    pub(crate) fn engine(&self) -> &RecordingEngine {
        &self.view
    }

    pub(crate) fn fail_connect(&self) {
        self.view.recording.lock().unwrap().fail_connect = true;
    }
}

impl Connector for RecordingConnector {
    fn connect(&self, driver: DriverKind, data_source: &str) -> Result<Box<dyn Engine>> {
        let mut rec = self.view.recording.lock().unwrap();
        rec.connects.push((driver, data_source.to_string()));
        rec.events.push(format!("connect {}", data_source));
        if rec.fail_connect {
            return Err(anyhow!("injected connect failure for {}", data_source));
        }
        Ok(Box::new(RecordingEngine {
            driver,
            recording: Arc::clone(&self.view.recording),
        }))
    }
}
