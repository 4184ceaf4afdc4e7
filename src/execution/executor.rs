//! Query Executor - dispatches a validated statement on read vs. write semantics

use crate::error::GatewayError;
use crate::execution::engine::SqlEngine;
use crate::execution::result::{ExecutionResult, TabularResult};
use crate::safety_guardrails::{classify, StatementClass};
use crate::sanitize::CandidateStatement;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Soft-fail executor: every call returns a displayable result.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn SqlEngine>,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn SqlEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Execute `stmt`. The class is recomputed here rather than trusted from
    /// the caller, so a rejected statement never reaches the engine.
    pub async fn execute(&self, stmt: &CandidateStatement) -> ExecutionResult {
        let class = classify(stmt);
        let start = Instant::now();
        debug!("Executing {} statement on {}: {}", class, self.engine.name(), stmt);

        let outcome = match class {
            StatementClass::Readonly => self
                .engine
                .fetch(stmt.as_str())
                .await
                .map(ExecutionResult::Tabular),
            StatementClass::Mutating => self.engine.apply(stmt.as_str()).await.map(|affected| {
                debug!("Write affected {} rows", affected);
                ExecutionResult::Tabular(TabularResult::success_marker())
            }),
            StatementClass::Rejected => {
                warn!("Executor refused a statement outside the allow-list");
                return ExecutionResult::error(
                    "statement does not start with an allowed SQL command; not executed",
                );
            }
        };

        let elapsed_ms = start.elapsed().as_millis();
        match outcome {
            Ok(result) => {
                info!("{} statement finished on {} in {}ms", class, self.engine.name(), elapsed_ms);
                result
            }
            Err(e) => {
                warn!("{} statement failed on {} after {}ms: {}", class, self.engine.name(), elapsed_ms, e);
                ExecutionResult::error(engine_message(e))
            }
        }
    }
}

/// Strip our own error prefix so the user sees the database's text.
fn engine_message(err: GatewayError) -> String {
    match err {
        GatewayError::Execution(message) => message,
        other => other.to_string(),
    }
}
