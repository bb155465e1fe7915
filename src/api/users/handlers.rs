/// Account administration (ADMIN) and per-user settings.
///
/// GET    /api/users           — list accounts
/// PUT    /api/users/{id}/role — change role
/// DELETE /api/users/{id}      — delete account and owned data
/// GET    /api/settings        — the caller's preferences
/// PUT    /api/settings        — update them
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, require_admin, store_error_response};
use crate::models::{Role, Settings};

pub(crate) async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    match state.store.list_users() {
        Ok(users) => Json(json!({ "users": users })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct RoleBody {
    role: String,
}

pub(crate) async fn update_role(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    let Some(role) = Role::parse(&body.role) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "role must be ADMIN, USER or GUEST",
        );
    };
    match state.store.update_user_role(&id, role) {
        Ok(updated) => {
            tracing::info!(user = %updated.username, role = %role.as_str(), "changed role");
            Json(json!({ "user": updated })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_admin(&user) {
        return response;
    }
    if user.0.id == id {
        return error_response(StatusCode::CONFLICT, "Cannot delete your own account");
    }
    match state.store.delete_user(&id) {
        Ok(()) => {
            tracing::info!(user_id = %id, "deleted account");
            Json(json!({ "ok": true })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    match state.store.get_settings(&user.0.id) {
        Ok(settings) => Json(json!({ "settings": settings })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct SettingsBody {
    #[serde(default)]
    hidden_collections: Vec<String>,
    #[serde(default)]
    hidden_users: Vec<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    theme: Option<String>,
}

pub(crate) async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<SettingsBody>,
) -> Response {
    let current = match state.store.get_settings(&user.0.id) {
        Ok(settings) => settings,
        Err(e) => return store_error_response(e),
    };
    let settings = Settings {
        user_id: user.0.id.clone(),
        hidden_collections: body.hidden_collections,
        hidden_users: body.hidden_users,
        locale: body.locale.unwrap_or(current.locale),
        theme: body.theme.unwrap_or(current.theme),
    };
    match state.store.update_settings(&settings) {
        Ok(saved) => Json(json!({ "settings": saved })).into_response(),
        Err(e) => store_error_response(e),
    }
}
