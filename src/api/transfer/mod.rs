pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transfer/export", get(handlers::export_json))
        .route("/transfer/export/markdown", get(handlers::export_markdown))
        .route("/transfer/import", post(handlers::import))
}
