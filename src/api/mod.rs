pub mod admin;
pub mod auth;
pub mod collections;
pub mod middleware;
pub mod prompts;
mod routes;
pub mod scrape;
pub mod tags;
pub mod transfer;
pub mod users;
pub mod workflows;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::json;

use crate::backup::BackupRunner;
use crate::models::User;
use crate::store::{Store, StoreError};

use auth::tokens::AuthKeys;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub http_client: Arc<reqwest::Client>,
    pub backup: Arc<BackupRunner>,
    pub auth: Arc<AuthKeys>,
}

/// The authenticated account, inserted by the auth middleware.
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Map store failures onto the HTTP surface: NotFound → 404,
/// Conflict → 409, Invalid → 422, everything else → 500.
pub(crate) fn store_error_response(err: StoreError) -> Response {
    let (status, message) = match &err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
        StoreError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
        _ => {
            tracing::error!(error = %err, "store operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Guests are read-only.
pub(crate) fn require_writer(user: &CurrentUser) -> Result<(), Response> {
    if user.0.role.can_write() {
        Ok(())
    } else {
        Err(error_response(StatusCode::FORBIDDEN, "Read-only account"))
    }
}

pub(crate) fn require_admin(user: &CurrentUser) -> Result<(), Response> {
    if user.0.role == crate::models::Role::Admin {
        Ok(())
    } else {
        Err(error_response(StatusCode::FORBIDDEN, "Admin access required"))
    }
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
