pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/config", get(handlers::get_config).put(handlers::update_config))
        .route("/admin/backup", post(handlers::run_backup))
        .route("/admin/backups", get(handlers::list_backups))
}
