pub mod handlers;

use axum::routing::get;
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(handlers::list_tags))
        .route("/tags/{id}", axum::routing::put(handlers::rename_tag).delete(handlers::delete_tag))
}
