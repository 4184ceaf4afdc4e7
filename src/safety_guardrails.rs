//! Safety Gate
//!
//! Classifies a candidate statement by its leading keyword and rejects
//! anything outside the allow-list. This is a prefix heuristic, not a parser:
//! it stops prose and truncated output from reaching the database, while
//! destructive-but-valid statements are left to the confirmation workflow.

use crate::error::{GatewayError, Result};
use crate::sanitize::CandidateStatement;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Leading keywords executed without confirmation.
pub const READONLY_PREFIXES: [&str; 5] = ["select", "with", "desc", "show", "pragma"];

/// Leading keywords that alter data or schema and need confirmation.
pub const MUTATING_PREFIXES: [&str; 6] = ["insert", "update", "delete", "create", "drop", "alter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementClass {
    Readonly,
    Mutating,
    Rejected,
}

impl StatementClass {
    /// Label used by the call log (`READ` / `WRITE`).
    pub fn query_type(&self) -> &'static str {
        match self {
            StatementClass::Readonly => "READ",
            StatementClass::Mutating => "WRITE",
            StatementClass::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for StatementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementClass::Readonly => "readonly",
            StatementClass::Mutating => "mutating",
            StatementClass::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// First whitespace-delimited token, lowercased.
pub fn leading_token(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(|t| t.to_lowercase())
        .unwrap_or_default()
}

pub fn classify_sql(sql: &str) -> StatementClass {
    let token = leading_token(sql);
    if READONLY_PREFIXES.contains(&token.as_str()) {
        StatementClass::Readonly
    } else if MUTATING_PREFIXES.contains(&token.as_str()) {
        StatementClass::Mutating
    } else {
        StatementClass::Rejected
    }
}

pub fn classify(stmt: &CandidateStatement) -> StatementClass {
    classify_sql(stmt.as_str())
}

/// Pass the statement through, or fail with `UnsafeStatement` when its
/// command class is not allow-listed.
pub fn enforce(stmt: CandidateStatement) -> Result<CandidateStatement> {
    match classify(&stmt) {
        StatementClass::Rejected => {
            let token = leading_token(stmt.as_str());
            warn!("Rejected statement with leading token {:?}", token);
            Err(GatewayError::UnsafeStatement(format!(
                "generated query does not start with a valid SQL command ('{}'); aborting for safety",
                token
            )))
        }
        _ => Ok(stmt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(sql: &str) -> CandidateStatement {
        CandidateStatement::from_completion(sql).unwrap()
    }

    #[test]
    fn test_readonly_prefixes() {
        for sql in [
            "SELECT * FROM pages",
            "with x as (select 1) select * from x",
            "DESC pages",
            "show search_path",
            "PRAGMA table_info(pages)",
        ] {
            assert_eq!(classify(&stmt(sql)), StatementClass::Readonly, "{}", sql);
        }
    }

    #[test]
    fn test_mutating_prefixes_case_insensitive() {
        for sql in [
            "INSERT INTO entities (entity_name) VALUES ('x')",
            "Update pages SET page_label = 'w2'",
            "delete from extracted2",
            "CREATE TABLE t (id int)",
            "DROP TABLE pages;",
            "alter table pages add column note text",
        ] {
            assert_eq!(classify(&stmt(sql)), StatementClass::Mutating, "{}", sql);
        }
    }

    #[test]
    fn test_rejects_unlisted_commands() {
        for sql in [
            "explain select 1",
            "; rm",
            "I cannot answer that.",
            "TRUNCATE pages",
            "selection of rows",
        ] {
            let err = enforce(stmt(sql)).unwrap_err();
            assert!(matches!(err, GatewayError::UnsafeStatement(_)), "{}", sql);
        }
    }

    #[test]
    fn test_enforce_passes_allowed_statement_unchanged() {
        let sql = "SELECT e.key FROM extracted2 e";
        assert_eq!(enforce(stmt(sql)).unwrap().as_str(), sql);
    }

    #[test]
    fn test_leading_token_handles_newlines() {
        assert_eq!(leading_token("\n\tSELECT\n1"), "select");
        assert_eq!(leading_token(""), "");
        assert_eq!(classify_sql(""), StatementClass::Rejected);
    }
}
