use std::collections::BTreeMap;

use crate::db::connection::Database;
use crate::error::{Result, SpliceError};
use crate::models::{ColumnDescriptor, TableSchema};

/// Tables shown in the textual schema rendering before truncation.
const MAX_RENDERED_TABLES: usize = 10;
/// Columns shown per table in the textual schema rendering.
const MAX_RENDERED_COLUMNS: usize = 8;
/// Distinct values sampled per text column.
const SAMPLE_VALUE_LIMIT: usize = 5;

/// Derives table/column metadata and sample categorical values from the store
/// itself. There is no separate metadata store.
#[derive(Clone)]
pub struct Introspector {
    db: Database,
}

impl Introspector {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                (),
            )
            .await
            .map_err(|error| SpliceError::Execution(error.to_string()))?;

        let mut names = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|error| SpliceError::Execution(error.to_string()))?
        {
            if let Ok(libsql::Value::Text(name)) = row.get_value(0) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Complete structured schema. Per-table failures are logged and the table
    /// is skipped; one bad table never fails the aggregate call.
    pub async fn describe_schema(&self) -> Result<Vec<TableSchema>> {
        let conn = self.db.connection().await?;
        let mut tables = Vec::new();

        for name in self.table_names().await? {
            let pragma = format!("PRAGMA table_info('{name}')");
            let mut rows = match conn.query(&pragma, ()).await {
                Ok(rows) => rows,
                Err(error) => {
                    tracing::warn!(table = %name, error = %error, "Skipping table during schema introspection");
                    continue;
                }
            };

            let mut columns = Vec::new();
            loop {
                match rows.next().await {
                    Ok(Some(row)) => {
                        // PRAGMA table_info columns: cid, name, type, notnull, dflt_value, pk
                        let col_name = match row.get_value(1) {
                            Ok(libsql::Value::Text(s)) => s,
                            _ => continue,
                        };
                        let declared_type = match row.get_value(2) {
                            Ok(libsql::Value::Text(s)) => s,
                            _ => String::new(),
                        };
                        columns.push(ColumnDescriptor {
                            name: col_name,
                            declared_type,
                        });
                    }
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(table = %name, error = %error, "Skipping table during schema introspection");
                        columns.clear();
                        break;
                    }
                }
            }

            if !columns.is_empty() {
                tables.push(TableSchema { name, columns });
            }
        }

        Ok(tables)
    }

    /// Distinct sample values for every text column, keyed `table.column`.
    /// Lets the reasoning loop discover valid literal spellings before it
    /// constructs a filter predicate.
    pub async fn sample_values(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let conn = self.db.connection().await?;
        let mut samples = BTreeMap::new();

        for table in self.describe_schema().await? {
            for column in table.columns.iter().filter(|c| c.is_text()) {
                let sql = format!(
                    "SELECT DISTINCT \"{}\" FROM \"{}\" LIMIT {SAMPLE_VALUE_LIMIT}",
                    column.name, table.name
                );
                let mut rows = match conn.query(&sql, ()).await {
                    Ok(rows) => rows,
                    Err(error) => {
                        tracing::warn!(
                            table = %table.name,
                            column = %column.name,
                            error = %error,
                            "Could not sample column values"
                        );
                        continue;
                    }
                };

                let mut values = Vec::new();
                while let Ok(Some(row)) = rows.next().await {
                    match row.get_value(0) {
                        Ok(libsql::Value::Text(s)) => values.push(s),
                        Ok(libsql::Value::Null) => {}
                        Ok(other) => values.push(format!("{other:?}")),
                        Err(_) => {}
                    }
                }

                if !values.is_empty() {
                    samples.insert(format!("{}.{}", table.name, column.name), values);
                }
            }
        }

        Ok(samples)
    }
}

/// Textual schema listing for the reasoning loop, truncated to keep the
/// context budget in check. The structured result stays complete.
pub fn render_schema(tables: &[TableSchema]) -> String {
    let mut output = String::from("Available tables and their schemas:\n\n");

    for (idx, table) in tables.iter().enumerate() {
        if idx >= MAX_RENDERED_TABLES {
            output.push_str(&format!(
                "... and {} more tables (use the sample values tool for specific table details)\n",
                tables.len() - idx
            ));
            break;
        }

        output.push_str(&format!("Table: {}\nColumns:\n", table.name));
        for (col_idx, column) in table.columns.iter().enumerate() {
            if col_idx >= MAX_RENDERED_COLUMNS {
                output.push_str(&format!(
                    "  ... and {} more columns\n",
                    table.columns.len() - col_idx
                ));
                break;
            }
            output.push_str(&format!(
                "  - {} ({})\n",
                column.name, column.declared_type
            ));
        }
        output.push_str(&format!("Sample query: {}\n\n", table.sample_query()));
    }

    output
}

pub fn render_sample_values(samples: &BTreeMap<String, Vec<String>>) -> String {
    if samples.is_empty() {
        return "No text columns with sample values were found.".to_string();
    }

    let mut output = String::from("Sample values for text columns:\n\n");
    for (key, values) in samples {
        output.push_str(&format!("{key}: {}\n", values.join(", ")));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, column_count: usize) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            columns: (0..column_count)
                .map(|i| ColumnDescriptor {
                    name: format!("col_{i}"),
                    declared_type: "TEXT".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_schema_truncates_tables() {
        let tables: Vec<TableSchema> = (0..12).map(|i| table(&format!("t{i}"), 2)).collect();
        let rendered = render_schema(&tables);
        assert!(rendered.contains("Table: t9"));
        assert!(!rendered.contains("Table: t10"));
        assert!(rendered.contains("... and 2 more tables"));
    }

    #[test]
    fn test_render_schema_truncates_columns() {
        let tables = vec![table("big", 11)];
        let rendered = render_schema(&tables);
        assert!(rendered.contains("col_7"));
        assert!(!rendered.contains("col_8 "));
        assert!(rendered.contains("... and 3 more columns"));
    }

    #[test]
    fn test_render_sample_values() {
        let mut samples = BTreeMap::new();
        samples.insert(
            "metadata.condition".to_string(),
            vec!["control".to_string(), "treated".to_string()],
        );
        let rendered = render_sample_values(&samples);
        assert!(rendered.contains("metadata.condition: control, treated"));
    }

    #[test]
    fn test_render_sample_values_empty() {
        let rendered = render_sample_values(&BTreeMap::new());
        assert!(rendered.contains("No text columns"));
    }
}
