use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SpliceError};

/// The closed set of actions the reasoning model may choose from. Free-form
/// model output is parsed into this enum; anything else becomes a corrective
/// re-prompt, never a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    Query { sql: String },
    DescribeSchema,
    SampleValues,
    RenderChart { request: String },
    ExportReport,
    Answer { text: String },
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    action: String,
    #[serde(default)]
    input: Option<String>,
}

impl AgentAction {
    /// Parse the reasoning model's raw output. Tolerates code fences and
    /// leading/trailing prose around the JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        let value = extract_json(text)?;
        let envelope: ActionEnvelope = serde_json::from_value(value).map_err(|error| {
            SpliceError::MalformedAction(format!(
                "expected an object with \"action\" and \"input\" fields: {error}"
            ))
        })?;

        let normalized = envelope
            .action
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        let input = envelope.input.unwrap_or_default();
        let require_input = |what: &str| -> Result<String> {
            if input.trim().is_empty() {
                Err(SpliceError::MalformedAction(format!(
                    "the \"{normalized}\" action requires {what} in the \"input\" field"
                )))
            } else {
                Ok(input.clone())
            }
        };

        match normalized.as_str() {
            "query" | "sql_query" => Ok(Self::Query {
                sql: require_input("a SQL statement")?,
            }),
            "schema" | "describe_schema" | "database_schema" => Ok(Self::DescribeSchema),
            "sample_values" | "sample_column_values" => Ok(Self::SampleValues),
            "create_plot" | "render_chart" | "plot" => Ok(Self::RenderChart {
                request: require_input("a chart request")?,
            }),
            "create_report" | "export_report" | "report" => Ok(Self::ExportReport),
            "answer" | "final_answer" | "final" => Ok(Self::Answer {
                text: require_input("the answer text")?,
            }),
            other => Err(SpliceError::MalformedAction(format!(
                "unknown action \"{other}\""
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::DescribeSchema => "schema",
            Self::SampleValues => "sample_values",
            Self::RenderChart { .. } => "create_plot",
            Self::ExportReport => "create_report",
            Self::Answer { .. } => "answer",
        }
    }

    /// One-line rendering for the turn transcript.
    pub fn describe(&self) -> String {
        match self {
            Self::Query { sql } => format!("query({sql})"),
            Self::RenderChart { request } => format!("create_plot({request})"),
            Self::Answer { .. } => "answer".to_string(),
            other => other.name().to_string(),
        }
    }
}

/// Pull a JSON object out of free-form model text: strip code fences, try the
/// whole text, then fall back to the outermost brace pair.
fn extract_json(text: &str) -> Result<Value> {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest.trim_start();
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest.trim_start();
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest.trim_end();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(SpliceError::MalformedAction(
        "response did not contain a JSON object".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_action() {
        let action = AgentAction::parse(r#"{"action": "query", "input": "SELECT 1"}"#).unwrap();
        assert_eq!(
            action,
            AgentAction::Query {
                sql: "SELECT 1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_answer_action() {
        let action =
            AgentAction::parse(r#"{"action": "answer", "input": "42 genes were found"}"#).unwrap();
        assert_eq!(
            action,
            AgentAction::Answer {
                text: "42 genes were found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_action_aliases() {
        let action =
            AgentAction::parse(r#"{"action": "SQL_Query", "input": "SELECT 1"}"#).unwrap();
        assert_eq!(action.name(), "query");

        let action = AgentAction::parse(r#"{"action": "Database_Schema"}"#).unwrap();
        assert_eq!(action, AgentAction::DescribeSchema);

        let action = AgentAction::parse(r#"{"action": "final answer", "input": "done"}"#).unwrap();
        assert_eq!(action.name(), "answer");
    }

    #[test]
    fn test_parse_with_code_fence() {
        let text = "```json\n{\"action\": \"schema\"}\n```";
        assert_eq!(AgentAction::parse(text).unwrap(), AgentAction::DescribeSchema);
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let text = "Sure, here is my action:\n{\"action\": \"sample_values\"}\nthanks";
        assert_eq!(AgentAction::parse(text).unwrap(), AgentAction::SampleValues);
    }

    #[test]
    fn test_parse_unknown_action_is_malformed() {
        let err = AgentAction::parse(r#"{"action": "delete_everything"}"#).unwrap_err();
        assert!(matches!(err, SpliceError::MalformedAction(_)));
    }

    #[test]
    fn test_parse_missing_required_input_is_malformed() {
        let err = AgentAction::parse(r#"{"action": "query"}"#).unwrap_err();
        assert!(matches!(err, SpliceError::MalformedAction(_)));
    }

    #[test]
    fn test_parse_non_json_is_malformed() {
        let err = AgentAction::parse("I think I should query the database").unwrap_err();
        assert!(matches!(err, SpliceError::MalformedAction(_)));
    }
}
