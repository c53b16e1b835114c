//! HTTP handlers for the `/ai-tools`, `/preview` and `/project-backend`
//! surfaces. Grounded on the teacher's `handlers::health`/`AppError`
//! idiom (plain async fns over `State`/`Path`/`Query`/`Json` extractors,
//! one `AppError` converted to a JSON error body at the edge) and on
//! `ai_orchestrator.py`'s file-write path for the validate+detect+install
//! sequencing that the `create_file`/`update_file` tools themselves don't
//! perform.

use crate::orchestrator::OrchestratorChunk;
use crate::packages::detect_packages;
use crate::process::ProcessError;
use crate::store::{FileLanguage, StoreError};
use crate::validator::{self, ValidationResult};
use crate::workspace::Workspace;
use crate::AppState;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_stream::StreamExt;
use uuid::Uuid;

/// Shared router state. Unlike the teacher's `ServerState`, this is the
/// same `AppState` built at startup — there's no separate file-watcher or
/// auth layer in scope here, so a second struct would just forward fields.
pub type OrchestratorState = Arc<AppState>;

#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FileNotFound { .. }
            | StoreError::TaskNotFound(_)
            | StoreError::ErrorRecordNotFound(_)
            | StoreError::ProjectNotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotRunning(_) => AppError::NotFound(err.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid project id: {raw}")))
}

// ---------------------------------------------------------------------------
// Chat stream
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    pub project_id: String,
    pub session_id: String,
    pub message: String,
}

fn render_chunk(chunk: OrchestratorChunk) -> String {
    match chunk {
        OrchestratorChunk::Text(text) => text,
        OrchestratorChunk::Status(status) => format!("\n[{status}]\n"),
        OrchestratorChunk::ToolResult { tool, success, detail } => {
            let outcome = if success { "ok" } else { "failed" };
            match detail {
                Some(d) => format!("\n[{tool}: {outcome} — {d}]\n"),
                None => format!("\n[{tool}: {outcome}]\n"),
            }
        }
        OrchestratorChunk::Warning(msg) => format!("\n[warning: {msg}]\n"),
        OrchestratorChunk::Done => String::new(),
    }
}

/// `POST /ai-tools/chat/stream` — drives the orchestrator for one turn and
/// streams the reply back as `text/plain` chunks as they're produced,
/// rather than buffering the whole turn before responding.
pub async fn chat_stream(
    State(state): State<OrchestratorState>,
    Json(req): Json<ChatStreamRequest>,
) -> Result<Response, AppError> {
    let project_id = parse_uuid(&req.project_id)?;
    let stream = state.orchestrator.generate_with_planning(project_id, req.session_id, req.message);
    let body_stream = stream.map(|chunk| Ok::<Bytes, std::io::Error>(Bytes::from(render_chunk(chunk))));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(body_stream))
        .unwrap())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FileWriteRequest {
    pub project_id: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct FileWriteResponse {
    pub success: bool,
    pub file: Option<Value>,
    pub validation: Option<ValidationResult>,
    pub packages_detected: Vec<String>,
    pub error: Option<String>,
}

async fn write_file(
    state: &OrchestratorState,
    tool_name: &str,
    mut req: FileWriteRequest,
) -> Result<Json<FileWriteResponse>, AppError> {
    let project_id = parse_uuid(&req.project_id)?;
    let language = FileLanguage::from_path(&req.path);
    let validator_language = match language {
        FileLanguage::Python => Some(validator::Language::Python),
        FileLanguage::Typescript => Some(validator::Language::Typescript),
        FileLanguage::Other => None,
    };

    let mut validation = validator_language.map(|l| validator::validate(l, &req.content));
    if let Some(v) = &validation {
        if !v.is_valid {
            if let Some(lang) = validator_language {
                if let Some(healed) = state.orchestrator.heal_file_validation(lang, &req.content).await {
                    req.content = healed;
                    validation = Some(validator::validate(lang, &req.content));
                }
            }
        }
    }
    if let Some(v) = &validation {
        if !v.is_valid {
            let detail = v
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "validation failed".to_string());
            return Err(AppError::BadRequest(detail));
        }
    }

    let result = state
        .tools
        .execute(tool_name, json!({"project_id": project_id, "path": req.path, "content": req.content}))
        .await;
    let success = result["success"].as_bool().unwrap_or(false);
    if !success {
        return Ok(Json(FileWriteResponse {
            success: false,
            file: None,
            validation,
            packages_detected: Vec::new(),
            error: result["error"].as_str().map(str::to_string),
        }));
    }

    let packages_detected: Vec<String> = validator_language
        .map(|l| detect_packages(l, &req.content).into_iter().collect())
        .unwrap_or_default();

    if !packages_detected.is_empty() {
        let package_manager = if language == FileLanguage::Python { "pip" } else { "npm" };
        let _ = state
            .tools
            .execute(
                "install_packages",
                json!({"project_id": project_id, "packages": packages_detected, "package_manager": package_manager}),
            )
            .await;
    }

    Ok(Json(FileWriteResponse {
        success: true,
        file: result.get("file").cloned(),
        validation,
        packages_detected,
        error: None,
    }))
}

pub async fn create_file(
    State(state): State<OrchestratorState>,
    Json(req): Json<FileWriteRequest>,
) -> Result<Json<FileWriteResponse>, AppError> {
    write_file(&state, "create_file", req).await
}

pub async fn update_file(
    State(state): State<OrchestratorState>,
    Json(req): Json<FileWriteRequest>,
) -> Result<Json<FileWriteResponse>, AppError> {
    write_file(&state, "update_file", req).await
}

#[derive(Debug, Deserialize, Default)]
pub struct ReadFilesQuery {
    pub file_path: Option<String>,
}

pub async fn read_files(
    State(state): State<OrchestratorState>,
    Path(project_id): Path<Uuid>,
    Query(q): Query<ReadFilesQuery>,
) -> Json<Value> {
    let mut args = json!({"project_id": project_id});
    if let Some(path) = q.file_path {
        args["paths"] = json!([path]);
    }
    Json(state.tools.execute("read_files", args).await)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

pub async fn create_task(State(state): State<OrchestratorState>, Json(req): Json<CreateTaskRequest>) -> Json<Value> {
    Json(
        state
            .tools
            .execute(
                "create_task",
                json!({
                    "project_id": req.project_id,
                    "title": req.title,
                    "description": req.description,
                    "priority": req.priority,
                }),
            )
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_id: String,
    pub status: Option<String>,
    pub description: Option<String>,
}

pub async fn update_task(State(state): State<OrchestratorState>, Json(req): Json<UpdateTaskRequest>) -> Json<Value> {
    Json(
        state
            .tools
            .execute("update_task", json!({"task_id": req.task_id, "status": req.status, "description": req.description}))
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct AddTaskCommentRequest {
    pub task_id: String,
    pub comment: String,
}

pub async fn add_task_comment(
    State(state): State<OrchestratorState>,
    Json(req): Json<AddTaskCommentRequest>,
) -> Json<Value> {
    Json(state.tools.execute("add_task_comment", json!({"task_id": req.task_id, "comment": req.comment})).await)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// `GET /ai-tools/errors/{project}` and `/ai-tools/errors/{project}/open` —
/// the store only tracks open vs. resolved (no standalone "list all"
/// query), so both forms return the currently open set.
pub async fn list_errors(State(state): State<OrchestratorState>, Path(project_id): Path<Uuid>) -> Json<Value> {
    Json(state.tools.execute("get_open_errors", json!({"project_id": project_id})).await)
}

// ---------------------------------------------------------------------------
// Preview build + static serving
// ---------------------------------------------------------------------------

pub async fn trigger_build(State(state): State<OrchestratorState>, Path(project_id): Path<Uuid>) -> Json<Value> {
    Json(state.tools.execute("trigger_build", json!({"project_id": project_id})).await)
}

/// `GET /preview/{project}` — the built frontend's `index.html`, with
/// asset paths rewritten to be served back through
/// `/preview/{project}/assets/...` instead of the bundler's root-relative
/// `/assets/...`.
pub async fn preview_index(
    State(state): State<OrchestratorState>,
    Path(project_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let dist_dir = state
        .build_cache
        .get(project_id)
        .ok_or_else(|| AppError::NotFound(format!("no build available for project {project_id}")))?;

    let html = tokio::fs::read_to_string(dist_dir.join("index.html"))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let rewritten = html
        .replace("src=\"/assets/", &format!("src=\"/preview/{project_id}/assets/"))
        .replace("href=\"/assets/", &format!("href=\"/preview/{project_id}/assets/"));

    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], rewritten).into_response())
}

fn mime_for(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "js" => "application/javascript",
        "css" => "text/css",
        "html" => "text/html; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        _ => "application/octet-stream",
    }
}

pub async fn preview_asset(
    State(state): State<OrchestratorState>,
    Path((project_id, asset_path)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let dist_dir = state
        .build_cache
        .get(project_id)
        .ok_or_else(|| AppError::NotFound(format!("no build available for project {project_id}")))?;

    let full_path = dist_dir.join("assets").join(&asset_path);
    let bytes = tokio::fs::read(&full_path)
        .await
        .map_err(|_| AppError::NotFound(format!("asset not found: {asset_path}")))?;

    Ok(([(header::CONTENT_TYPE, mime_for(&asset_path))], bytes).into_response())
}

// ---------------------------------------------------------------------------
// Project backend lifecycle
// ---------------------------------------------------------------------------

pub async fn backend_start(
    State(state): State<OrchestratorState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workspace = Workspace::new(&state.config.workspace_base, project_id);
    let venv_ready = crate::workspace::venv_ready(&workspace).await;
    let backend = state.processes.start(&workspace, venv_ready).await?;
    Ok(Json(json!(backend)))
}

pub async fn backend_stop(
    State(state): State<OrchestratorState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.processes.stop(project_id).await?;
    Ok(Json(json!({"success": true})))
}

pub async fn backend_restart(
    State(state): State<OrchestratorState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let workspace = Workspace::new(&state.config.workspace_base, project_id);
    let venv_ready = crate::workspace::venv_ready(&workspace).await;
    let backend = state.processes.restart(&workspace, venv_ready).await?;
    Ok(Json(json!(backend)))
}

pub async fn backend_status(State(state): State<OrchestratorState>, Path(project_id): Path<Uuid>) -> Json<Value> {
    match state.processes.status(project_id).await {
        Some(backend) => Json(json!(backend)),
        None => Json(json!({"status": "stopped"})),
    }
}
