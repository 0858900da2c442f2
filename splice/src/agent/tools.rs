use regex::Regex;

use crate::agent::action::AgentAction;
use crate::db::{introspect, Introspector, QueryGateway};
use crate::error::SpliceError;
use crate::models::ChartSpec;
use crate::render::{ChartRenderer, ReportExporter};
use crate::session::SessionContext;

/// What a tool call produced: the observation text fed back to the reasoning
/// loop, plus any artifact filenames for the turn outcome.
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    pub observation: String,
    pub plot_filename: Option<String>,
    pub report_filename: Option<String>,
    pub is_error: bool,
}

impl ToolOutcome {
    fn text(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            ..Self::default()
        }
    }

    fn error(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            is_error: true,
            ..Self::default()
        }
    }
}

/// The tools exposed to the reasoning loop. Each is a stateless function over
/// the session context plus its own input; every failure is converted into a
/// descriptive observation here and never aborts the turn.
#[derive(Clone)]
pub struct Toolbox {
    gateway: QueryGateway,
    introspector: Introspector,
    renderer: ChartRenderer,
    exporter: ReportExporter,
    preview_rows: usize,
    cache_freshness_secs: i64,
}

impl Toolbox {
    pub fn new(
        gateway: QueryGateway,
        introspector: Introspector,
        renderer: ChartRenderer,
        exporter: ReportExporter,
        preview_rows: usize,
        cache_freshness_secs: i64,
    ) -> Self {
        Self {
            gateway,
            introspector,
            renderer,
            exporter,
            preview_rows,
            cache_freshness_secs,
        }
    }

    pub async fn dispatch(&self, session: &SessionContext, action: &AgentAction) -> ToolOutcome {
        match action {
            AgentAction::Query { sql } => self.run_query(session, sql).await,
            AgentAction::DescribeSchema => self.describe_schema(session).await,
            AgentAction::SampleValues => self.sample_values().await,
            AgentAction::RenderChart { request } => self.render_chart(session, request),
            AgentAction::ExportReport => self.export_report(session),
            AgentAction::Answer { .. } => {
                // Answer is terminal; the runner never dispatches it.
                ToolOutcome::error("The answer action is not a tool")
            }
        }
    }

    async fn run_query(&self, session: &SessionContext, sql: &str) -> ToolOutcome {
        tracing::info!(sql, "Executing query tool");

        let result = match self.gateway.execute(sql).await {
            Ok(result) => result,
            Err(SpliceError::Execution(message)) => {
                return ToolOutcome::error(self.execution_hint(sql, &message).await);
            }
            Err(error) => return ToolOutcome::error(error.to_string()),
        };

        if result.is_empty() {
            return ToolOutcome::text(
                "Query executed successfully but returned no results. The query syntax was \
                 correct but no data matches your criteria.",
            );
        }

        session.store_result(result.rows.clone(), result.columns.clone(), sql);
        tracing::info!(
            rows = result.row_count,
            columns = result.columns.len(),
            "Query data stored for plotting"
        );

        let mut observation = result.preview(self.preview_rows);
        observation.push_str(
            "\nThis is the actual data from the database. Use it to answer the user's question \
             with specific details.\nNOTE: This data has been stored and is available for \
             plotting or export.",
        );
        ToolOutcome::text(observation)
    }

    /// Enrich a store-reported error with schema context so the reasoning
    /// loop can correct itself, mirroring what a human analyst would check.
    async fn execution_hint(&self, sql: &str, message: &str) -> String {
        let mut output = format!("Query failed: {message}\n\n");
        let lowered = message.to_lowercase();

        if lowered.contains("no such table") {
            match self.introspector.table_names().await {
                Ok(tables) if !tables.is_empty() => {
                    output.push_str(&format!("Available tables: {}\n", tables.join(", ")));
                }
                Ok(_) => output.push_str("The database contains no tables.\n"),
                Err(error) => {
                    tracing::warn!(error = %error, "Could not list tables for error hint");
                    output.push_str("Could not retrieve available tables.\n");
                }
            }
        } else if lowered.contains("no such column") {
            if let Some(table) = referenced_table(sql) {
                match self.introspector.describe_schema().await {
                    Ok(tables) => {
                        if let Some(schema) = tables.iter().find(|t| t.name == table) {
                            let columns: Vec<&str> =
                                schema.columns.iter().map(|c| c.name.as_str()).collect();
                            output.push_str(&format!(
                                "Available columns in table '{table}': {}\n",
                                columns.join(", ")
                            ));
                        } else {
                            output.push_str(&format!(
                                "Could not get column information for table '{table}'.\n"
                            ));
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Could not describe schema for error hint");
                    }
                }
            }
        }

        output.push_str(
            "\nRECOMMENDATION: Use the schema tool first to understand the data structure, then \
             use the sample values tool to see actual data values before writing queries.",
        );
        output
    }

    async fn describe_schema(&self, session: &SessionContext) -> ToolOutcome {
        // The snapshot is invalidated on session reset, not by time.
        let tables = match session.schema_snapshot() {
            Some(tables) => tables,
            None => match self.introspector.describe_schema().await {
                Ok(tables) => {
                    session.set_schema_snapshot(tables.clone());
                    tables
                }
                Err(error) => {
                    return ToolOutcome::error(format!("Error retrieving schema: {error}"));
                }
            },
        };

        ToolOutcome::text(introspect::render_schema(&tables))
    }

    async fn sample_values(&self) -> ToolOutcome {
        match self.introspector.sample_values().await {
            Ok(samples) => ToolOutcome::text(introspect::render_sample_values(&samples)),
            Err(error) => ToolOutcome::error(format!("Error retrieving sample values: {error}")),
        }
    }

    fn render_chart(&self, session: &SessionContext, request: &str) -> ToolOutcome {
        // Allow-list check first: an unknown chart type fails before the
        // cache is consulted at all.
        let spec = match ChartSpec::parse(request) {
            Ok(spec) => spec,
            Err(error) => return ToolOutcome::error(format!("Plot creation failed: {error}")),
        };

        let cached = match session.fresh_result(self.cache_freshness_secs) {
            Ok(cached) => cached,
            Err(error) => return ToolOutcome::error(format!("Plot creation failed: {error}")),
        };

        match self.renderer.render(&spec, &cached) {
            Ok(filename) => {
                let observation = format!(
                    "{} plot created successfully and saved to: {filename}\n\
                     Now that the plot is created, finish with a biologically rich final answer \
                     covering summary statistics, notable genes or pathways, and implications of \
                     the observed patterns.",
                    spec.kind()
                );
                ToolOutcome {
                    observation,
                    plot_filename: Some(filename),
                    report_filename: None,
                    is_error: false,
                }
            }
            Err(error) => ToolOutcome::error(format!("Plot creation failed: {error}")),
        }
    }

    fn export_report(&self, session: &SessionContext) -> ToolOutcome {
        let cached = match session.fresh_result(self.cache_freshness_secs) {
            Ok(cached) => cached,
            Err(error) => return ToolOutcome::error(format!("Report export failed: {error}")),
        };

        match self.exporter.export(&cached) {
            Ok(filename) => ToolOutcome {
                observation: format!(
                    "Report with {} rows exported to: {filename}",
                    cached.rows.len()
                ),
                plot_filename: None,
                report_filename: Some(filename),
                is_error: false,
            },
            Err(error) => ToolOutcome::error(format!("Report export failed: {error}")),
        }
    }
}

/// Table named by the query's FROM clause, for error hints.
fn referenced_table(sql: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)\bFROM\s+["'`\[]?(\w+)"#).ok()?;
    pattern
        .captures(sql)
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_table() {
        assert_eq!(
            referenced_table("SELECT * FROM metadata WHERE a = 1"),
            Some("metadata".to_string())
        );
        assert_eq!(
            referenced_table("select gene from \"dea_results\" limit 5"),
            Some("dea_results".to_string())
        );
        assert_eq!(referenced_table("PRAGMA table_info(x)"), None);
    }
}
