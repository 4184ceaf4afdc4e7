mod common;

use common::{EngineCall, RecordingEngine};
use docsql_gateway::execution::{ExecutionResult, QueryExecutor, SqliteEngine};
use docsql_gateway::sanitize::CandidateStatement;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn stmt(sql: &str) -> CandidateStatement {
    CandidateStatement::from_completion(sql).unwrap()
}

fn seeded_sqlite() -> (TempDir, QueryExecutor) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docs.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE entities (entity_id INTEGER PRIMARY KEY, entity_type TEXT, entity_name TEXT);
             CREATE TABLE pages (id INTEGER PRIMARY KEY, preprocessed TEXT, page_label TEXT);
             INSERT INTO entities (entity_type, entity_name) VALUES ('business', 'Company XYZ');
             INSERT INTO pages (preprocessed, page_label) VALUES ('lease_p1.png', 'lease_agreement');",
        )
        .unwrap();
    (dir, QueryExecutor::new(Arc::new(SqliteEngine::new(path))))
}

#[tokio::test]
async fn test_missing_table_returns_database_message() {
    let (_dir, executor) = seeded_sqlite();

    let result = executor.execute(&stmt("SELECT * FROM nonexistent;")).await;

    assert!(result.is_error());
    assert!(result.error_message().unwrap().contains("no such table: nonexistent"));
    assert!(result.to_text().starts_with("error"));
}

#[tokio::test]
async fn test_select_returns_rows_in_order() {
    let (_dir, executor) = seeded_sqlite();

    let result = executor
        .execute(&stmt("SELECT entity_type, entity_name FROM entities ORDER BY entity_id"))
        .await;

    let table = result.tabular().unwrap();
    assert_eq!(table.columns, vec!["entity_type", "entity_name"]);
    assert_eq!(table.rows, vec![vec![json!("business"), json!("Company XYZ")]]);
}

#[tokio::test]
async fn test_write_returns_success_marker_and_persists() {
    let (_dir, executor) = seeded_sqlite();

    let result = executor
        .execute(&stmt("INSERT INTO entities (entity_type, entity_name) VALUES ('person', 'John Doe');"))
        .await;
    let table = result.tabular().unwrap();
    assert_eq!(table.columns, vec!["result"]);
    assert_eq!(table.rows, vec![vec![json!("Query executed successfully")]]);

    let count = executor.execute(&stmt("SELECT COUNT(*) AS n FROM entities")).await;
    assert_eq!(count.tabular().unwrap().value(0, "n"), Some(&json!(2)));
}

#[tokio::test]
async fn test_pragma_is_read() {
    let (_dir, executor) = seeded_sqlite();

    let result = executor.execute(&stmt("PRAGMA table_info(pages)")).await;
    let table = result.tabular().unwrap();
    assert!(table.columns.contains(&"name".to_string()));
    assert_eq!(table.row_count(), 3);
}

#[tokio::test]
async fn test_read_and_write_dispatch() {
    let engine = Arc::new(RecordingEngine::new());
    let executor = QueryExecutor::new(engine.clone());

    executor.execute(&stmt("WITH x AS (SELECT 1) SELECT * FROM x")).await;
    executor.execute(&stmt("alter table pages add column notes text")).await;

    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::Fetch("WITH x AS (SELECT 1) SELECT * FROM x".to_string()),
            EngineCall::Apply("alter table pages add column notes text".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_rejected_statement_is_not_sent() {
    let engine = Arc::new(RecordingEngine::new());
    let executor = QueryExecutor::new(engine.clone());

    let result = executor.execute(&stmt("explain select 1")).await;

    assert!(matches!(result, ExecutionResult::Error { .. }));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_engine_failure_is_soft() {
    let executor = QueryExecutor::new(Arc::new(RecordingEngine::failing("relation \"nonexistent\" does not exist")));

    let result = executor.execute(&stmt("SELECT * FROM nonexistent;")).await;

    assert_eq!(result.error_message(), Some("relation \"nonexistent\" does not exist"));
    assert_eq!(result.to_markdown(), "Error executing query: relation \"nonexistent\" does not exist");
}
