//! Postgres Execution Engine
//!
//! One connection per call: opened at the start of `fetch`/`apply` and closed
//! before returning. Reads go through a prepared statement, which also keeps
//! a read from smuggling a second statement along with it.

use crate::db::connection::connect;
use crate::error::{GatewayError, Result};
use crate::execution::engine::SqlEngine;
use crate::execution::result::TabularResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo};
use tracing::debug;
use uuid::Uuid;

pub struct PostgresEngine {
    options: PgConnectOptions,
}

impl PostgresEngine {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    async fn open(&self) -> Result<PgConnection> {
        connect(&self.options).await.map_err(db_error)
    }
}

fn db_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db) => GatewayError::Execution(db.message().to_string()),
        other => GatewayError::Execution(other.to_string()),
    }
}

async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        debug!("Error closing postgres connection: {}", e);
    }
}

async fn fetch_on(conn: &mut PgConnection, sql: &str) -> Result<TabularResult> {
    let statement = (&mut *conn).prepare(sql).await.map_err(db_error)?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let rows = statement.query().fetch_all(&mut *conn).await.map_err(db_error)?;
    let rows = rows.iter().map(row_to_values).collect();

    Ok(TabularResult::new(columns, rows))
}

async fn apply_on(conn: &mut PgConnection, sql: &str) -> Result<u64> {
    let mut tx = conn.begin().await.map_err(db_error)?;
    let done = (&mut *tx).execute(sqlx::raw_sql(sql)).await.map_err(db_error)?;
    tx.commit().await.map_err(db_error)?;
    Ok(done.rows_affected())
}

fn row_to_values(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| cell_value(row, idx, col.type_info().name()))
        .collect()
}

fn cell_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    let decoded: std::result::Result<Value, sqlx::Error> = match type_name {
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::String).unwrap_or(Value::Null)),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null)),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null)),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|f| float_value(f as f64)).unwrap_or(Value::Null)),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map(float_value).unwrap_or(Value::Null)),
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_string())).unwrap_or(Value::Null)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_rfc3339())).unwrap_or(Value::Null)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null)),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_string())).unwrap_or(Value::Null)),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(idx)
            .map(|v| v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null)),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(idx)
            .map(|v| v.unwrap_or(Value::Null)),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::String).unwrap_or(Value::Null)),
    };

    decoded.unwrap_or_else(|e| {
        debug!("Could not decode {} column {}: {}", type_name, idx, e);
        Value::String(format!("<{}>", type_name.to_lowercase()))
    })
}

fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[async_trait]
impl SqlEngine for PostgresEngine {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(&self, sql: &str) -> Result<TabularResult> {
        let mut conn = self.open().await?;
        let result = fetch_on(&mut conn, sql).await;
        close(conn).await;
        result
    }

    async fn apply(&self, sql: &str) -> Result<u64> {
        let mut conn = self.open().await?;
        let result = apply_on(&mut conn, sql).await;
        close(conn).await;
        result
    }
}
