pub mod handlers;
pub mod tokens;

use axum::routing::{get, post};
use axum::Router;

use crate::api::AppState;

/// Reachable without a token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(handlers::me))
}
