pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts", get(handlers::list_prompts).post(handlers::create_prompt))
        .route(
            "/prompts/{id}",
            get(handlers::get_prompt)
                .put(handlers::update_prompt)
                .delete(handlers::delete_prompt),
        )
        .route("/prompts/{id}/versions", get(handlers::list_versions))
        .route(
            "/prompts/{id}/versions/{number}/restore",
            post(handlers::restore_version),
        )
        .route(
            "/prompts/{id}/favorite",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        .route("/prompts/{id}/use", post(handlers::record_use))
        .route("/prompts/{id}/attachments", post(handlers::upload_attachment))
        .route("/attachments/{id}", delete(handlers::delete_attachment))
}

/// Raw attachment retrieval stays public: ids are unguessable uuids and the
/// dashboard embeds them in plain <img>/<a> tags.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/attachments/{id}", get(handlers::download_attachment))
}
