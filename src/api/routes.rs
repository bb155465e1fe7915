use axum::Json;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use hyper::StatusCode;
use hyper::header;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use super::middleware;
use super::AppState;

pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route(
        "/",
        get(|| async {
            Json(json!({
                "status": "ok",
            }))
        }),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api", api_router(state.clone()))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::strip_trailing_slash))
        .layer(axum::middleware::from_fn(
            middleware::enrich_current_span_middleware,
        ))
}

fn api_router(state: AppState) -> Router<AppState> {
    // Everything except login/registration and raw attachment retrieval
    // sits behind the bearer-token middleware.
    let protected = Router::new()
        .merge(super::auth::protected_router())
        .merge(super::users::router())
        .merge(super::collections::router())
        .merge(super::prompts::router())
        .merge(super::tags::router())
        .merge(super::transfer::router())
        .merge(super::scrape::router())
        .merge(super::workflows::router())
        .merge(super::admin::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .merge(super::auth::public_router())
        .merge(super::prompts::public_router())
        .merge(protected)
}

async fn not_found(req: axum::extract::Request) -> impl IntoResponse {
    tracing::warn!("unhandled path: {}", req.uri());
    (StatusCode::NOT_FOUND, "Not Found")
}
