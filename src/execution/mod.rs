//! Execution Module - soft-fail query execution over pluggable SQL engines
//!
//! - `SqlEngine` trait for database backends
//! - `QueryExecutor` for read/write dispatch
//! - Engine implementations (Postgres, SQLite)

pub mod engine;
pub mod executor;
pub mod result;

// Engine implementations
pub mod postgres_engine;
pub mod sqlite_engine;

pub use engine::SqlEngine;
pub use executor::QueryExecutor;
pub use postgres_engine::PostgresEngine;
pub use result::{ExecutionResult, TabularResult};
pub use sqlite_engine::SqliteEngine;
