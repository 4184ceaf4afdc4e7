//! Response Sanitizer - recovers candidate SQL from raw completion text

use crate::error::{GatewayError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref OPENING_FENCE: Regex = Regex::new(r"```(?i:sql)?").unwrap();
}

/// Strip code-fence markers (optionally tagged `sql`) and surrounding whitespace.
///
/// Statement content is otherwise left untouched: no re-casing, no re-quoting.
pub fn clean(raw: &str) -> String {
    let without_opening = OPENING_FENCE.replace_all(raw, "");
    without_opening.replace("```", "").trim().to_string()
}

/// Sanitized SQL text: non-empty, trimmed and free of fence markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateStatement(String);

impl CandidateStatement {
    /// Sanitize raw completion text into a candidate statement.
    pub fn from_completion(raw: &str) -> Result<Self> {
        let cleaned = clean(raw);
        if cleaned.is_empty() {
            return Err(GatewayError::Generation(
                "completion contained no SQL after sanitizing".to_string(),
            ));
        }
        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tagged_fence() {
        let raw = "```sql\nSELECT * FROM pages;\n```";
        assert_eq!(clean(raw), "SELECT * FROM pages;");
    }

    #[test]
    fn test_strips_untagged_and_uppercase_tag() {
        assert_eq!(clean("```\nselect 1\n```"), "select 1");
        assert_eq!(clean("```SQL select 1```"), "select 1");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```sql\nSELECT 1\n```",
            "  plain text  ",
            "``````sql```",
            "```sql```sql SELECT 'a' ```",
            "",
        ];
        for raw in inputs {
            let once = clean(raw);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", raw);
            assert!(!once.contains("```"));
        }
    }

    #[test]
    fn test_empty_completion_is_generation_error() {
        let err = CandidateStatement::from_completion("```sql\n```").unwrap_err();
        assert!(matches!(err, GatewayError::Generation(_)));

        let stmt = CandidateStatement::from_completion(" ```sql SELECT 1 ``` ").unwrap();
        assert_eq!(stmt.as_str(), "SELECT 1");
    }

    #[test]
    fn test_preserves_content() {
        let raw = "SELECT Key, \"Value\" FROM extracted2 WHERE key = 'First_Name'";
        assert_eq!(clean(raw), raw);
    }
}
