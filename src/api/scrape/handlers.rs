/// POST /api/scrape — fetch an external page and return prompt candidates.
/// Body: `{ "url": "...", "selector": "...", "min_length": 80, "limit": 20 }`
/// Nothing is persisted; the dashboard saves picked candidates through the
/// prompt endpoints.
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, require_writer, store_error_response};
use crate::scrape;

#[derive(Deserialize)]
pub(crate) struct ScrapeBody {
    url: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

pub(crate) async fn scrape(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ScrapeBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.get_global_config() {
        Ok(config) if !config.enable_scraping => {
            return error_response(StatusCode::FORBIDDEN, "Scraping is disabled");
        }
        Ok(_) => {}
        Err(e) => return store_error_response(e),
    }

    let url = body.url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "url must be http(s)");
    }

    let candidates = scrape::fetch_candidates(
        &state.http_client,
        url,
        body.selector.as_deref(),
        body.min_length.unwrap_or(scrape::DEFAULT_MIN_LENGTH),
        body.limit.unwrap_or(scrape::DEFAULT_LIMIT).min(100),
    )
    .await;

    match candidates {
        Ok(candidates) => {
            tracing::info!(url = %url, count = candidates.len(), "scraped prompt candidates");
            Json(json!({ "candidates": candidates })).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_GATEWAY, &format!("scrape failed: {e}")),
    }
}
