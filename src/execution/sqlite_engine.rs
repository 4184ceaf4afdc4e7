//! SQLite Execution Engine
//!
//! Local backend over a database file. rusqlite is blocking, so each call
//! runs on the blocking pool with its own connection.

use crate::error::{GatewayError, Result};
use crate::execution::engine::SqlEngine;
use crate::execution::result::TabularResult;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub struct SqliteEngine {
    path: PathBuf,
}

impl SqliteEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || job(&path))
            .await
            .map_err(|e| GatewayError::Execution(format!("SQLite task failed: {}", e)))?
    }
}

fn sqlite_error(err: rusqlite::Error) -> GatewayError {
    GatewayError::Execution(err.to_string())
}

fn open(path: &Path) -> Result<Connection> {
    Connection::open(path).map_err(sqlite_error)
}

fn fetch_blocking(path: &Path, sql: &str) -> Result<TabularResult> {
    let conn = open(path)?;
    let mut batch = Batch::new(&conn, sql);
    let mut stmt = batch
        .next()
        .map_err(sqlite_error)?
        .ok_or_else(|| GatewayError::Execution("no statement to run".to_string()))?;
    // prepare() alone would silently ignore anything after the first statement
    if batch.next().map_err(sqlite_error)?.is_some() {
        return Err(GatewayError::Execution(
            "cannot run multiple statements in a single read".to_string(),
        ));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(sqlite_error)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(sqlite_error)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(json_value(row.get_ref(idx).map_err(sqlite_error)?));
        }
        out.push(values);
    }

    Ok(TabularResult::new(columns, out))
}

fn apply_blocking(path: &Path, sql: &str) -> Result<u64> {
    let mut conn = open(path)?;
    let tx = conn.transaction().map_err(sqlite_error)?;
    tx.execute_batch(sql).map_err(sqlite_error)?;
    let affected = tx.changes();
    tx.commit().map_err(sqlite_error)?;
    Ok(affected)
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

#[async_trait]
impl SqlEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch(&self, sql: &str) -> Result<TabularResult> {
        let sql = sql.to_string();
        self.run_blocking(move |path| fetch_blocking(path, &sql)).await
    }

    async fn apply(&self, sql: &str) -> Result<u64> {
        let sql = sql.to_string();
        self.run_blocking(move |path| apply_blocking(path, &sql)).await
    }
}
