/// Prompt endpoints.
///
/// GET    /api/prompts                               — list with filters
/// POST   /api/prompts                               — create (version 1)
/// GET    /api/prompts/{id}                          — detail
/// PUT    /api/prompts/{id}                          — update (content edits
///                                                     append a version)
/// DELETE /api/prompts/{id}                          — delete + tag pruning
/// GET    /api/prompts/{id}/versions                 — history, newest first
/// POST   /api/prompts/{id}/versions/{n}/restore     — copy version n to head
/// POST   /api/prompts/{id}/favorite                 — mark favorite
/// DELETE /api/prompts/{id}/favorite                 — unmark
/// POST   /api/prompts/{id}/use                      — usage counter
/// POST   /api/prompts/{id}/attachments              — upload (base64 body)
/// GET    /api/attachments/{id}                      — raw bytes (public)
/// DELETE /api/attachments/{id}                      — remove attachment
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, error_response, require_writer, store_error_response};
use crate::models::{AttachmentRole, PromptVariable};
use crate::store::StoreError;
use crate::store::prompts::{NewPrompt, PromptFilter, PromptUpdate};

/// 5 MiB decoded. The dashboard stores screenshots and small result files,
/// not datasets.
const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    favorites: bool,
    #[serde(default)]
    include_hidden: bool,
}

pub(crate) async fn list_prompts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    let hidden_collections = if query.include_hidden {
        Vec::new()
    } else {
        match state.store.get_settings(&user.0.id) {
            Ok(settings) => settings.hidden_collections,
            Err(e) => return store_error_response(e),
        }
    };

    let filter = PromptFilter {
        collection: query.collection,
        tag: query.tag,
        query: query.q,
        favorites_only: query.favorites,
        hidden_collections,
    };
    match state.store.list_prompts(Some(&user.0.id), &filter) {
        Ok(prompts) => Json(json!({ "prompts": prompts })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct CreateBody {
    title: String,
    content: String,
    #[serde(default)]
    short_content: Option<String>,
    #[serde(default)]
    usage_example: Option<String>,
    #[serde(default)]
    variables: Vec<PromptVariable>,
    #[serde(default)]
    collection_ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub(crate) async fn create_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    let new = NewPrompt {
        title: body.title,
        content: body.content,
        short_content: body.short_content,
        usage_example: body.usage_example,
        variables: body.variables,
        collection_ids: body.collection_ids,
        tags: body.tags,
    };
    match state.store.create_prompt(&user.0.id, new) {
        Ok(detail) => {
            tracing::info!(title = %detail.prompt.title, "created prompt");
            (StatusCode::CREATED, Json(json!({ "prompt": detail }))).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn get_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_prompt_detail(&id, Some(&user.0.id)) {
        Ok(Some(detail)) => Json(json!({ "prompt": detail })).into_response(),
        Ok(None) => store_error_response(StoreError::NotFound("prompt")),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdateBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, with = "double_option")]
    short_content: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    usage_example: Option<Option<String>>,
    #[serde(default)]
    variables: Option<Vec<PromptVariable>>,
    #[serde(default)]
    collection_ids: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Distinguish an absent key from an explicit null ("clear the field").
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de).map(Some)
    }
}

pub(crate) async fn update_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    let update = PromptUpdate {
        title: body.title,
        content: body.content,
        short_content: body.short_content,
        usage_example: body.usage_example,
        variables: body.variables,
        collection_ids: body.collection_ids,
        tags: body.tags,
    };
    match state.store.update_prompt(&id, Some(&user.0.id), update) {
        Ok(detail) => Json(json!({ "prompt": detail })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn delete_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.delete_prompt(&id) {
        Ok(true) => {
            tracing::info!(prompt_id = %id, "deleted prompt");
            Json(json!({ "ok": true })).into_response()
        }
        Ok(false) => store_error_response(StoreError::NotFound("prompt")),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.list_versions(&id) {
        Ok(versions) if versions.is_empty() => store_error_response(StoreError::NotFound("prompt")),
        Ok(versions) => Json(json!({ "versions": versions })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn restore_version(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, number)): Path<(String, i64)>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.restore_version(&id, number) {
        Ok(version) => {
            tracing::info!(prompt_id = %id, restored = number, head = version.version_number, "restored version");
            Json(json!({ "version": version })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn add_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    match state.store.set_favorite(&user.0.id, &id, true) {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn remove_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    match state.store.set_favorite(&user.0.id, &id, false) {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Analytics increment: the dashboard calls this when a prompt is copied
/// into the clipboard or run through an external tool.
pub(crate) async fn record_use(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.increment_usage(&id) {
        Ok(usage_count) => Json(json!({ "usage_count": usage_count })).into_response(),
        Err(e) => store_error_response(e),
    }
}

// ── Attachments ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct AttachmentBody {
    filename: String,
    #[serde(default)]
    media_type: Option<String>,
    /// "ATTACHMENT" (default) or "RESULT".
    #[serde(default)]
    role: Option<String>,
    /// Base64-encoded file contents.
    data: String,
}

pub(crate) async fn upload_attachment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<AttachmentBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    let role = match body.role.as_deref() {
        None => AttachmentRole::Attachment,
        Some(raw) => match AttachmentRole::parse(raw) {
            Some(role) => role,
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "role must be ATTACHMENT or RESULT",
                );
            }
        },
    };
    let data = match BASE64.decode(body.data.as_bytes()) {
        Ok(data) => data,
        Err(_) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, "data must be valid base64");
        }
    };
    if data.len() > MAX_ATTACHMENT_BYTES {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "attachment exceeds 5 MiB");
    }

    let media_type = body
        .media_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    match state
        .store
        .add_attachment(&id, role, &body.filename, &media_type, &data)
    {
        Ok(attachment) => {
            tracing::info!(prompt_id = %id, filename = %attachment.filename, size = attachment.size, "uploaded attachment");
            (StatusCode::CREATED, Json(json!({ "attachment": attachment }))).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn download_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_attachment(&id) {
        Ok(Some((attachment, data))) => {
            let filename = utf8_percent_encode(&attachment.filename, NON_ALPHANUMERIC).to_string();
            (
                StatusCode::OK,
                [
                    ("content-type", attachment.media_type.clone()),
                    (
                        "content-disposition",
                        format!("attachment; filename*=UTF-8''{filename}"),
                    ),
                ],
                data,
            )
                .into_response()
        }
        Ok(None) => store_error_response(StoreError::NotFound("attachment")),
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn delete_attachment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.delete_attachment(&id) {
        Ok(true) => Json(json!({ "ok": true })).into_response(),
        Ok(false) => store_error_response(StoreError::NotFound("attachment")),
        Err(e) => store_error_response(e),
    }
}
