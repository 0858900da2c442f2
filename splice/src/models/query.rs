use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One result row as a column-name → value mapping.
pub type Row = HashMap<String, serde_json::Value>;

/// The outcome of one successfully executed query. Immutable once returned;
/// execution failures are reported as typed errors, never as a flag here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in the order the store reported them.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Row-limited tabular text preview fed back to the reasoning loop.
    pub fn preview(&self, max_rows: usize) -> String {
        let mut output = format!("Query returned {} rows. ", self.row_count);
        if self.row_count > max_rows {
            output.push_str(&format!("Showing first {max_rows} rows:\n"));
        } else {
            output.push_str("Here are all the results:\n");
        }

        let header = self.columns.join(" | ");
        output.push('\n');
        output.push_str(&header);
        output.push('\n');
        output.push_str(&"-".repeat(header.len()));
        output.push('\n');

        for row in self.rows.iter().take(max_rows) {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| display_value(row.get(col)))
                .collect();
            output.push_str(&values.join(" | "));
            output.push('\n');
        }

        output
    }
}

/// Render a cell without JSON string quoting.
pub fn display_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
