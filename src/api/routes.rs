//! Form-io REST API
//!
//! Endpoints:
//! - POST /api/rhino/solve/                 - Solve a definition with form inputs
//! - GET  /api/rhino/params/?file=          - Definition input/output manifest
//! - POST /api/chat/                        - Prompt → single parameter update
//! - GET  /api/projects/                    - List projects
//! - POST /api/projects/                    - Create a project
//! - GET  /api/projects/:id/                - Fetch a project
//! - DELETE /api/projects/:id/              - Delete a project
//! - POST /api/projects/:id/save-inputs/    - Persist inputs and geometry
//! - GET  /api/health                       - Liveness

use std::sync::Arc;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use super::presentation::color_for;
use crate::agent::ChatPipeline;
use crate::compute::ComputeService;
use crate::error::{FormIoError, Result};
use crate::parameters::{inputs_from_json, ParameterCatalog, ParameterMap};
use crate::project::{NewProject, Project, ProjectStore, SaveInputs};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ParameterCatalog>,
    pub pipeline: Arc<ChatPipeline>,
    pub compute: Arc<ComputeService>,
    pub projects: Arc<dyn ProjectStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat/", post(chat).fallback(invalid_method))
        .route("/api/rhino/solve/", post(solve).fallback(post_only))
        .route("/api/rhino/params/", get(params).fallback(invalid_method))
        .route(
            "/api/projects/",
            get(list_projects)
                .post(create_project)
                .fallback(unsupported_method),
        )
        .route(
            "/api/projects/:id/",
            get(get_project)
                .delete(delete_project)
                .fallback(unsupported_method),
        )
        .route(
            "/api/projects/:id/save-inputs/",
            post(save_inputs).fallback(post_only),
        )
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// ============================================================================
// Request / response types
// ============================================================================

/// Solve form fields, sent urlencoded or as multipart
#[derive(Debug, Default, Deserialize)]
pub struct SolveForm {
    #[serde(default)]
    pub grasshopper_file_name: Option<String>,
    #[serde(default)]
    pub input_data: Option<String>,
}

impl SolveForm {
    /// Parse `input_data`; a missing or blank field means no inputs
    pub fn inputs(&self) -> Result<ParameterMap> {
        match self.input_data.as_deref().map(str::trim) {
            None | Some("") => Ok(ParameterMap::new()),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw).map_err(|e| {
                    FormIoError::validation(format!("Invalid input data: {}", e))
                })?;
                inputs_from_json(&value)
            }
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for SolveForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Form(form) = Form::<SolveForm>::from_request(req, state)
                .await
                .map_err(|e| bad_form(e.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| bad_form(e.body_text()))?;

        let mut form = SolveForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_form(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let text = field.text().await.map_err(|e| bad_form(e.body_text()))?;
            match name.as_str() {
                "grasshopper_file_name" => form.grasshopper_file_name = Some(text),
                "input_data" => form.input_data = Some(text),
                _ => {}
            }
        }
        Ok(form)
    }
}

fn bad_form(message: String) -> ApiError {
    ApiError::with_success_flag(FormIoError::validation(message))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub inputs: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub parameters: ChatParameters,
}

#[derive(Debug, Serialize)]
pub struct ChatParameters {
    pub parameters: ParameterMap,
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
pub struct ParamsQuery {
    pub file: Option<String>,
}

/// Listing row: the project plus its display colour
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub color: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn solve(
    State(state): State<AppState>,
    form: SolveForm,
) -> std::result::Result<Json<Value>, ApiError> {
    let inputs = form.inputs().map_err(ApiError::with_success_flag)?;
    let name = form.grasshopper_file_name.unwrap_or_default();

    let result = state
        .compute
        .solve(&name, &inputs)
        .await
        .map_err(ApiError::with_success_flag)?;
    Ok(Json(result))
}

async fn params(
    State(state): State<AppState>,
    Query(query): Query<ParamsQuery>,
) -> std::result::Result<Json<Value>, ApiError> {
    let name = query.file.unwrap_or_default();
    let manifest = state
        .compute
        .manifest(&name)
        .await
        .map_err(ApiError::plain)?;
    Ok(Json(manifest))
}

async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let request: ChatRequest = parse_json(&body).map_err(ApiError::chat)?;
    let current = match &request.inputs {
        Some(value) if !value.is_null() => inputs_from_json(value).map_err(ApiError::chat)?,
        _ => ParameterMap::new(),
    };
    let prompt = request.prompt.unwrap_or_default();

    let outcome = state
        .pipeline
        .run(&prompt, &current)
        .await
        .map_err(ApiError::chat)?;

    Ok(Json(ChatResponse {
        parameters: ChatParameters {
            parameters: outcome.parameters(),
            reasoning: outcome.reasoning,
        },
    }))
}

async fn list_projects(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<ProjectSummary>>, ApiError> {
    let projects = state
        .projects
        .list()
        .await
        .map_err(ApiError::with_success_flag)?;

    let summaries = projects
        .into_iter()
        .map(|project| ProjectSummary {
            color: color_for(&project.id.to_string()),
            project,
        })
        .collect();
    Ok(Json(summaries))
}

async fn create_project(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<Project>), ApiError> {
    let new: NewProject = parse_json(&body).map_err(ApiError::with_success_flag)?;
    let new = new
        .sanitize(&state.catalog)
        .map_err(ApiError::with_success_flag)?;

    let project = state
        .projects
        .create(new)
        .await
        .map_err(ApiError::with_success_flag)?;
    info!(project_id = %project.id, name = %project.name, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Project>, ApiError> {
    let id = parse_project_id(&id).map_err(ApiError::with_success_flag)?;
    let project = state
        .projects
        .get(id)
        .await
        .map_err(ApiError::with_success_flag)?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    let id = parse_project_id(&id).map_err(ApiError::with_success_flag)?;
    state
        .projects
        .delete(id)
        .await
        .map_err(ApiError::with_success_flag)?;
    info!(project_id = %id, "Project deleted");
    Ok(Json(json!({ "success": true })))
}

async fn save_inputs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let id = parse_project_id(&id).map_err(ApiError::with_success_flag)?;
    let patch: SaveInputs = parse_json(&body).map_err(ApiError::with_success_flag)?;
    let patch = patch
        .sanitize(&state.catalog)
        .map_err(ApiError::with_success_flag)?;

    state
        .projects
        .save_inputs(id, patch)
        .await
        .map_err(ApiError::with_success_flag)?;
    info!(project_id = %id, "Project inputs saved");
    Ok(Json(json!({ "success": true })))
}

// Wrong-method answers, one per response envelope

async fn invalid_method() -> ApiError {
    ApiError::plain(FormIoError::validation("Invalid request method"))
        .with_status(StatusCode::METHOD_NOT_ALLOWED)
}

async fn post_only() -> ApiError {
    ApiError::with_success_flag(FormIoError::validation("Only POST method allowed."))
        .with_status(StatusCode::METHOD_NOT_ALLOWED)
}

async fn unsupported_method() -> ApiError {
    ApiError::with_success_flag(FormIoError::validation("Method not allowed"))
        .with_status(StatusCode::METHOD_NOT_ALLOWED)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    if body.is_empty() {
        return Err(FormIoError::validation("Request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| FormIoError::validation(format!("Invalid JSON body: {}", e)))
}

/// Unparseable ids cannot name a stored project
fn parse_project_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| FormIoError::not_found(format!("Project {} not found", raw)))
}
