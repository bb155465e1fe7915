/// Account endpoints.
///
/// POST /api/auth/register — create a USER account (first account ever
///                           becomes ADMIN; gated by allow_registration)
/// POST /api/auth/login    — verify credentials, return a bearer token
/// GET  /api/auth/me       — the authenticated account
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, store_error_response};
use crate::models::Role;

#[derive(Deserialize)]
pub(crate) struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    /// Username or email.
    login: String,
    password: String,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Response {
    if body.password.len() < 8 {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be at least 8 characters",
        );
    }

    let user_count = match state.store.count_users() {
        Ok(count) => count,
        Err(e) => return store_error_response(e),
    };

    // The very first account bootstraps the instance and becomes ADMIN,
    // regardless of the registration flag.
    let role = if user_count == 0 { Role::Admin } else { Role::User };
    if user_count > 0 {
        match state.store.get_global_config() {
            Ok(config) if !config.allow_registration => {
                return error_response(StatusCode::FORBIDDEN, "Registration is disabled");
            }
            Ok(_) => {}
            Err(e) => return store_error_response(e),
        }
    }

    let password_hash = match bcrypt::hash(&body.password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "failed to hash password");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    let user = match state.store.create_user(&body.username, &body.email, &password_hash, role) {
        Ok(user) => user,
        Err(e) => return store_error_response(e),
    };

    let token = match state.auth.mint(&user) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to mint token");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    tracing::info!(username = %user.username, role = %user.role.as_str(), "registered account");
    (StatusCode::CREATED, Json(json!({ "token": token, "user": user }))).into_response()
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Response {
    let user = match state.store.find_account(&body.login) {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => return store_error_response(e),
    };

    let valid = bcrypt::verify(&body.password, &user.password_hash).unwrap_or(false);
    if !valid {
        tracing::warn!(login = %body.login, "failed login attempt");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let token = match state.auth.mint(&user) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to mint token");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    Json(json!({ "token": token, "user": user })).into_response()
}

pub(crate) async fn me(Extension(user): Extension<CurrentUser>) -> Response {
    Json(json!({ "user": user.0 })).into_response()
}
