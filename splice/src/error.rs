use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Database connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Statement rejected: {0}")]
    RejectedStatement(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("No data available for plotting or export. Run a query that returns rows first.")]
    NoData,

    #[error("Cached query data is stale ({age_secs}s old). Re-run the query before plotting or exporting.")]
    StaleData { age_secs: i64 },

    #[error("Unknown chart type '{0}'")]
    UnknownChartType(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Malformed reasoning output: {0}")]
    MalformedAction(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for SpliceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SpliceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            SpliceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SpliceError::RejectedStatement(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SpliceError::UnknownChartType(_) | SpliceError::MissingColumn(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            SpliceError::NoData | SpliceError::StaleData { .. } => {
                (StatusCode::CONFLICT, self.to_string())
            }
            SpliceError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            SpliceError::ConnectionUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            SpliceError::Execution(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SpliceError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            SpliceError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            SpliceError::Csv(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            SpliceError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            SpliceError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            SpliceError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            SpliceError::LlmRateLimit { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("LLM rate limit exceeded, retry after {retry_after:?} seconds"),
            ),
            SpliceError::MalformedAction(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            SpliceError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, SpliceError>;
