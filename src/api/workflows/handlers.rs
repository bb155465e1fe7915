/// Workflow endpoints: ordered prompt sequences.
///
/// GET    /api/workflows      — list
/// POST   /api/workflows      — create
/// GET    /api/workflows/{id} — detail
/// PUT    /api/workflows/{id} — update (steps replaced wholesale)
/// DELETE /api/workflows/{id} — delete
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, require_writer, store_error_response};
use crate::models::WorkflowStep;
use crate::store::StoreError;

pub(crate) async fn list_workflows(State(state): State<AppState>) -> Response {
    match state.store.list_workflows() {
        Ok(workflows) => Json(json!({ "workflows": workflows })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct CreateBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    steps: Vec<WorkflowStep>,
}

pub(crate) async fn create_workflow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state
        .store
        .create_workflow(&user.0.id, &body.name, &body.description, &body.steps)
    {
        Ok(workflow) => {
            tracing::info!(name = %workflow.name, steps = workflow.steps.len(), "created workflow");
            (StatusCode::CREATED, Json(json!({ "workflow": workflow }))).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_workflow(&id) {
        Ok(Some(workflow)) => Json(json!({ "workflow": workflow })).into_response(),
        Ok(None) => store_error_response(StoreError::NotFound("workflow")),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdateBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    steps: Option<Vec<WorkflowStep>>,
}

pub(crate) async fn update_workflow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.update_workflow(
        &id,
        body.name.as_deref(),
        body.description.as_deref(),
        body.steps.as_deref(),
    ) {
        Ok(workflow) => Json(json!({ "workflow": workflow })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn delete_workflow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.delete_workflow(&id) {
        Ok(true) => Json(json!({ "ok": true })).into_response(),
        Ok(false) => store_error_response(StoreError::NotFound("workflow")),
        Err(e) => store_error_response(e),
    }
}
