/// Admin surface: global configuration and backups.
///
/// GET  /api/admin/config  — the singleton feature flags
/// PUT  /api/admin/config  — update them
/// POST /api/admin/backup  — write a backup now
/// GET  /api/admin/backups — list backup files
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, require_admin, store_error_response};
use crate::models::GlobalConfiguration;

pub(crate) async fn get_config(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    match state.store.get_global_config() {
        Ok(config) => Json(json!({ "config": config })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn update_config(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(config): Json<GlobalConfiguration>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    match state.store.update_global_config(&config) {
        Ok(()) => {
            tracing::info!(
                allow_registration = config.allow_registration,
                enable_scraping = config.enable_scraping,
                enable_backups = config.enable_backups,
                "updated global configuration"
            );
            Json(json!({ "config": config })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn run_backup(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    match state.backup.run_once() {
        Ok(name) => Json(json!({ "file": name })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "on-demand backup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("backup failed: {e}"))
        }
    }
}

pub(crate) async fn list_backups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    match state.backup.list_backups() {
        Ok(backups) => Json(json!({ "backups": backups })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list backups");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list backups")
        }
    }
}
