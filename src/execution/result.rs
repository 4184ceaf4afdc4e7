//! Execution Result - uniform tabular-or-error outcome of a statement

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column name of the single-row result produced by a successful write.
pub const SUCCESS_COLUMN: &str = "result";
/// Literal success marker produced by a successful write.
pub const SUCCESS_MARKER: &str = "Query executed successfully";
/// Column name used when rendering an error as a table.
pub const ERROR_COLUMN: &str = "error";

/// Ordered named columns plus rows in the order the engine returned them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn success_marker() -> Self {
        Self {
            columns: vec![SUCCESS_COLUMN.to_string()],
            rows: vec![vec![Value::String(SUCCESS_MARKER.to_string())]],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row_idx`, if both exist.
    pub fn value(&self, row_idx: usize, column: &str) -> Option<&Value> {
        let col_idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row_idx)?.get(col_idx)
    }

    /// Plain, column-aligned text rendering (no index column).
    pub fn to_text(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let mut lines = Vec::with_capacity(cells.len() + 1);
        lines.push(pad_line(self.columns.iter().map(String::as_str), &widths));
        for row in &cells {
            lines.push(pad_line(row.iter().map(String::as_str), &widths));
        }
        lines.join("\n")
    }

    pub fn to_markdown(&self) -> String {
        if self.rows.is_empty() {
            return "The query returned no results.".to_string();
        }

        let mut table = format!("| {} |\n", self.columns.join(" | "));
        table.push_str(&format!(
            "| {} |\n",
            self.columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
        ));
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    other => cell_text(other).replace('|', "\\|"),
                })
                .collect();
            table.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        table
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pad_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Either a tabular result or an error record. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResult {
    Tabular(TabularResult),
    Error { message: String },
}

impl ExecutionResult {
    pub fn error(message: impl Into<String>) -> Self {
        ExecutionResult::Error { message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionResult::Error { .. })
    }

    pub fn tabular(&self) -> Option<&TabularResult> {
        match self {
            ExecutionResult::Tabular(t) => Some(t),
            ExecutionResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ExecutionResult::Error { message } => Some(message),
            ExecutionResult::Tabular(_) => None,
        }
    }

    /// Errors render as a one-column `error` table so callers always get
    /// something displayable.
    pub fn to_text(&self) -> String {
        match self {
            ExecutionResult::Tabular(t) => t.to_text(),
            ExecutionResult::Error { message } => TabularResult::new(
                vec![ERROR_COLUMN.to_string()],
                vec![vec![Value::String(message.clone())]],
            )
            .to_text(),
        }
    }

    pub fn to_markdown(&self) -> String {
        match self {
            ExecutionResult::Tabular(t) => t.to_markdown(),
            ExecutionResult::Error { message } => format!("Error executing query: {}", message),
        }
    }

    /// Chat history rendering: `Result:` followed by a fenced text table.
    pub fn to_chat_message(&self) -> String {
        format!("Result:\n```\n{}\n```", self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TabularResult {
        TabularResult::new(
            vec!["entity_name".to_string(), "pages".to_string()],
            vec![
                vec![json!("Company XYZ"), json!(12)],
                vec![json!("JJ LLC"), Value::Null],
            ],
        )
    }

    #[test]
    fn test_text_rendering_aligns_columns() {
        let text = sample().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "entity_name  pages");
        assert_eq!(lines[1], "Company XYZ  12");
        assert_eq!(lines[2], "JJ LLC       NULL");
    }

    #[test]
    fn test_markdown_rendering() {
        let md = sample().to_markdown();
        assert!(md.starts_with("| entity_name | pages |\n| --- | --- |\n"));
        assert!(md.contains("| JJ LLC |  |"));
        assert_eq!(TabularResult::default().to_markdown(), "The query returned no results.");
    }

    #[test]
    fn test_success_marker_shape() {
        let marker = TabularResult::success_marker();
        assert_eq!(marker.columns, vec![SUCCESS_COLUMN]);
        assert_eq!(marker.row_count(), 1);
        assert_eq!(marker.value(0, SUCCESS_COLUMN), Some(&json!(SUCCESS_MARKER)));
    }

    #[test]
    fn test_error_renders_as_error_table() {
        let result = ExecutionResult::error("relation \"nonexistent\" does not exist");
        assert!(result.is_error());
        assert!(result.tabular().is_none());
        assert!(result.to_text().starts_with("error"));
        assert!(result.to_chat_message().contains("nonexistent"));
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let value = serde_json::to_value(ExecutionResult::error("boom")).unwrap();
        assert_eq!(value, json!({"kind": "error", "message": "boom"}));
    }
}
