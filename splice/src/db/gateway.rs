use crate::db::connection::Database;
use crate::db::readonly;
use crate::error::{Result, SpliceError};
use crate::models::{QueryResult, Row};

/// Read-only query surface over the tabular store.
///
/// Statements are classified before the store is touched; execution failures
/// surface the store's message verbatim so the reasoning loop can
/// self-correct.
#[derive(Clone)]
pub struct QueryGateway {
    db: Database,
}

impl QueryGateway {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        readonly::ensure_read_only(sql)?;

        let conn = self.db.connection().await?;

        let mut rows = match conn.query(sql, ()).await {
            Ok(rows) => rows,
            Err(error) => {
                return Err(SpliceError::Execution(error.to_string()));
            }
        };

        let column_count = rows.column_count();
        let mut columns = Vec::with_capacity(column_count as usize);
        for idx in 0..column_count {
            columns.push(
                rows.column_name(idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("column_{idx}")),
            );
        }

        let mut result_rows: Vec<Row> = Vec::new();
        loop {
            let row = match rows.next().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(error) => {
                    self.db.invalidate_connection();
                    return Err(SpliceError::Execution(error.to_string()));
                }
            };

            let mut mapped = Row::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                let value = row
                    .get_value(idx as i32)
                    .map_err(|error| SpliceError::Execution(error.to_string()))?;
                mapped.insert(column.clone(), value_to_json(value));
            }
            result_rows.push(mapped);
        }

        tracing::debug!(
            rows = result_rows.len(),
            columns = columns.len(),
            "Query executed"
        );

        Ok(QueryResult::new(columns, result_rows))
    }
}

fn value_to_json(value: libsql::Value) -> serde_json::Value {
    match value {
        libsql::Value::Null => serde_json::Value::Null,
        libsql::Value::Integer(i) => serde_json::Value::from(i),
        libsql::Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        libsql::Value::Text(s) => serde_json::Value::String(s),
        libsql::Value::Blob(b) => serde_json::Value::String(format!("blob({} bytes)", b.len())),
    }
}
