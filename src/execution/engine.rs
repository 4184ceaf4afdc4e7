//! SQL Engine Trait - contract for database backends
//!
//! Backends only know how to run a result-producing query or a write. The
//! read/write decision and the soft-fail conversion live in the executor.

use crate::error::Result;
use crate::execution::result::TabularResult;
use async_trait::async_trait;

#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Engine name (e.g. "postgres", "sqlite")
    fn name(&self) -> &'static str;

    /// Run a result-producing statement. Column names come from the
    /// statement metadata, so an empty result still carries them.
    async fn fetch(&self, sql: &str) -> Result<TabularResult>;

    /// Run a statement that affects rows, committing on success.
    /// Returns the number of affected rows when the engine reports it.
    async fn apply(&self, sql: &str) -> Result<u64>;
}
