/// Import/export endpoints.
///
/// GET  /api/transfer/export          — versioned JSON document (download)
/// GET  /api/transfer/export/markdown — human-readable Markdown rendition
/// POST /api/transfer/import          — unified import (legacy array or
///                                      format-2 document), returns counts
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, require_writer, store_error_response};
use crate::transfer;

pub(crate) async fn export_json(State(state): State<AppState>) -> Response {
    let document = match transfer::build_export(&state.store, state.backup.base_url()) {
        Ok(document) => document,
        Err(e) => return store_error_response(e),
    };
    let body = match serde_json::to_string_pretty(&document) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize export");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };
    let filename = format!("prompthive-export-{}.json", Utc::now().format("%Y%m%d"));
    (
        StatusCode::OK,
        [
            ("content-type", "application/json".to_string()),
            ("content-disposition", format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

pub(crate) async fn export_markdown(State(state): State<AppState>) -> Response {
    match transfer::markdown::render_library(&state.store) {
        Ok(markdown) => (
            StatusCode::OK,
            [("content-type", "text/markdown; charset=utf-8")],
            markdown,
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn import(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(document): Json<serde_json::Value>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    if document.is_null() {
        return error_response(StatusCode::BAD_REQUEST, "request body must be a JSON document");
    }
    match transfer::import_document(&state.store, &user.0.id, &document) {
        Ok(report) => Json(json!(report)).into_response(),
        Err(e) => store_error_response(e),
    }
}
