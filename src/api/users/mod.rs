pub mod handlers;

use axum::routing::{delete, get, put};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/{id}/role", put(handlers::update_role))
        .route("/users/{id}", delete(handlers::delete_user))
        .route("/settings", get(handlers::get_settings).put(handlers::update_settings))
}
