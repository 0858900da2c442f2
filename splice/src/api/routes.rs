use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::state::AppState;
use crate::error::{Result, SpliceError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub reset: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/reset", post(reset))
        .route("/api/v1/plots/{filename}", get(download_plot))
        .route("/api/v1/reports/{filename}", get(download_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(SpliceError::Validation("Message cannot be empty".to_string()));
    }

    let session = state.sessions.get_or_create(request.session_id.as_deref());
    let outcome = state.agent.ask(&session, &request.message).await;

    Ok(Json(ChatResponse {
        session_id: session.id.clone(),
        answer: outcome.answer,
        plot_filename: outcome.plot_filename,
        report_filename: outcome.report_filename,
    }))
}

async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Json<ResetResponse> {
    let session = state.sessions.get_or_create(Some(&request.session_id));
    session.reset();
    Json(ResetResponse {
        session_id: session.id.clone(),
        reset: true,
    })
}

async fn download_plot(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse> {
    let content = read_artifact(&state.config.artifacts.plots_dir, &filename).await?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], content))
}

async fn download_report(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse> {
    let content = read_artifact(&state.config.artifacts.reports_dir, &filename).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        content,
    ))
}

async fn read_artifact(dir: &str, filename: &str) -> Result<Vec<u8>> {
    // Artifact names are flat; anything that navigates is refused.
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(SpliceError::Validation(format!(
            "Invalid artifact filename '{filename}'"
        )));
    }

    let path = FsPath::new(dir).join(filename);
    tokio::fs::read(&path)
        .await
        .map_err(|_| SpliceError::NotFound(format!("Artifact '{filename}' not found")))
}
