/// Collection endpoints.
///
/// GET    /api/collections                           — full tree (hidden ones
///                                                     filtered per settings)
/// POST   /api/collections                           — create
/// GET    /api/collections/{id}                      — node + children + prompts
/// PUT    /api/collections/{id}                      — rename / re-parent
/// DELETE /api/collections/{id}?delete_prompts=bool  — recursive delete
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, CurrentUser, require_writer, store_error_response};
use crate::models::CollectionNode;
use crate::store::collections::CollectionUpdate;
use crate::store::prompts::PromptFilter;

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    include_hidden: bool,
}

pub(crate) async fn list_collections(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    let tree = match state.store.collection_tree() {
        Ok(tree) => tree,
        Err(e) => return store_error_response(e),
    };

    let tree = if query.include_hidden {
        tree
    } else {
        match state.store.get_settings(&user.0.id) {
            Ok(settings) => filter_hidden(tree, &settings.hidden_collections),
            Err(e) => return store_error_response(e),
        }
    };

    Json(json!({ "collections": tree })).into_response()
}

/// Drop hidden nodes together with their subtrees.
fn filter_hidden(tree: Vec<CollectionNode>, hidden: &[String]) -> Vec<CollectionNode> {
    tree.into_iter()
        .filter(|node| !hidden.contains(&node.collection.id))
        .map(|mut node| {
            node.children = filter_hidden(std::mem::take(&mut node.children), hidden);
            node
        })
        .collect()
}

#[derive(Deserialize)]
pub(crate) struct CreateBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parent_id: Option<String>,
}

pub(crate) async fn create_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.create_collection(
        &user.0.id,
        &body.name,
        &body.description,
        body.parent_id.as_deref(),
    ) {
        Ok(collection) => {
            tracing::info!(name = %collection.name, "created collection");
            Json(json!({ "collection": collection })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub(crate) async fn get_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Response {
    let collection = match state.store.get_collection(&id) {
        Ok(Some(collection)) => collection,
        Ok(None) => {
            return store_error_response(crate::store::StoreError::NotFound("collection"));
        }
        Err(e) => return store_error_response(e),
    };
    let children = match state.store.children_of(&id) {
        Ok(children) => children,
        Err(e) => return store_error_response(e),
    };
    let prompts = match state.store.list_prompts(
        Some(&user.0.id),
        &PromptFilter { collection: Some(id), ..PromptFilter::default() },
    ) {
        Ok(prompts) => prompts,
        Err(e) => return store_error_response(e),
    };

    Json(json!({
        "collection": collection,
        "children": children,
        "prompts": prompts,
    }))
    .into_response()
}

#[derive(Deserialize)]
pub(crate) struct UpdateBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Present-and-null moves the collection to the root.
    #[serde(default, with = "double_option")]
    parent_id: Option<Option<String>>,
}

/// Distinguish an absent `parent_id` key from an explicit null.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de).map(Some)
    }
}

pub(crate) async fn update_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    let update = CollectionUpdate {
        name: body.name,
        description: body.description,
        parent_id: body.parent_id,
    };
    match state.store.update_collection(&id, update) {
        Ok(collection) => Json(json!({ "collection": collection })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
pub(crate) struct DeleteQuery {
    #[serde(default)]
    delete_prompts: bool,
}

pub(crate) async fn delete_collection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    if let Err(response) = require_writer(&user) {
        return response;
    }
    match state.store.delete_collection(&id, query.delete_prompts) {
        Ok(report) => {
            tracing::info!(
                collection_id = %id,
                collections = report.collections_deleted,
                prompts_deleted = report.prompts_deleted,
                prompts_detached = report.prompts_detached,
                "deleted collection tree"
            );
            Json(json!(report)).into_response()
        }
        Err(e) => store_error_response(e),
    }
}
