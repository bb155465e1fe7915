/// Tag endpoints.
///
/// GET    /api/tags      — names with usage counts
/// PUT    /api/tags/{id} — rename (renaming onto an existing name merges)
/// DELETE /api/tags/{id} — delete tag and its joins
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, require_writer, store_error_response};
use crate::store::StoreError;

pub(crate) async fn list_tags(State(state): State<AppState>) -> Response {
    match state.store.list_tags() {
        Ok(tags) => Json(json!({ "tags": tags })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct RenameBody {
    name: String,
}

pub(crate) async fn rename_tag(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RenameBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.rename_tag(&id, &body.name) {
        Ok(tag) => Json(json!({ "tag": tag })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn delete_tag(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.delete_tag(&id) {
        Ok(true) => Json(json!({ "ok": true })).into_response(),
        Ok(false) => store_error_response(StoreError::NotFound("tag")),
        Err(e) => store_error_response(e),
    }
}
