//! Import and export of the prompt library.
//!
//! Export writes a versioned JSON document (format 2). Import accepts either
//! that document or the legacy flat shape (a bare array of
//! `{title, content, category?, tags?}` objects) and reconciles both into
//! the store: tags deduplicated by case-insensitive name, collection
//! hierarchies recreated or mapped onto existing ones, invalid records
//! skipped and reported.

pub mod markdown;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PromptVariable;
use crate::store::prompts::{PromptFilter, VersionSeed};
use crate::store::{Store, StoreError, StoreResult};

pub const EXPORT_FORMAT: &str = "prompthive-export";
pub const EXPORT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub format: String,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    /// Base URL of the instance that produced the document.
    #[serde(default)]
    pub source: String,
    pub collections: Vec<ExportCollection>,
    pub prompts: Vec<ExportPrompt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportCollection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPrompt {
    pub title: String,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Oldest first, matching version numbering.
    pub versions: Vec<ExportVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportVersion {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_example: Option<String>,
    #[serde(default)]
    pub variables: Vec<PromptVariable>,
}

/// Pre-migration flat record. `tags` shows up both as an array and as a
/// comma-separated string in the wild.
#[derive(Debug, Deserialize)]
struct LegacyPrompt {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<LegacyTags>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyTags {
    List(Vec<String>),
    Csv(String),
}

impl LegacyTags {
    fn into_names(self) -> Vec<String> {
        match self {
            LegacyTags::List(names) => names,
            LegacyTags::Csv(csv) => csv.split(',').map(|s| s.trim().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub collections: usize,
    pub tags: usize,
    pub errors: Vec<String>,
}

// ── Export ─────────────────────────────────────────────────────────────────

pub fn build_export(store: &Store, base_url: &str) -> StoreResult<ExportDocument> {
    let collections = store
        .list_collections()?
        .into_iter()
        .map(|c| ExportCollection {
            id: c.id,
            name: c.name,
            description: c.description,
            parent_id: c.parent_id,
        })
        .collect();

    let mut prompts = Vec::new();
    for detail in store.list_prompts(None, &PromptFilter::default())? {
        let mut versions = store.list_versions(&detail.prompt.id)?;
        versions.reverse(); // newest-first in the store, oldest-first on the wire
        prompts.push(ExportPrompt {
            title: detail.prompt.title,
            collection_ids: detail.collection_ids,
            tags: detail.tags,
            versions: versions
                .into_iter()
                .map(|v| ExportVersion {
                    content: v.content,
                    short_content: v.short_content,
                    usage_example: v.usage_example,
                    variables: v.variables,
                })
                .collect(),
        });
    }

    Ok(ExportDocument {
        format: EXPORT_FORMAT.to_string(),
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        source: base_url.to_string(),
        collections,
        prompts,
    })
}

// ── Import ─────────────────────────────────────────────────────────────────

/// Both input shapes, reduced to one.
struct NormalizedImport {
    collections: Vec<ExportCollection>,
    prompts: Vec<ExportPrompt>,
}

fn normalize(document: &serde_json::Value) -> StoreResult<NormalizedImport> {
    if document.is_array() {
        return normalize_legacy(document);
    }

    if let Some(object) = document.as_object() {
        let version = object.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        if version == EXPORT_VERSION as u64 {
            let doc: ExportDocument = serde_json::from_value(document.clone())?;
            return Ok(NormalizedImport { collections: doc.collections, prompts: doc.prompts });
        }
        return Err(StoreError::Invalid(format!(
            "unsupported export version: {version}"
        )));
    }

    Err(StoreError::Invalid("unrecognized import format".into()))
}

fn normalize_legacy(document: &serde_json::Value) -> StoreResult<NormalizedImport> {
    let records: Vec<LegacyPrompt> = serde_json::from_value(document.clone())?;

    // Categories become flat root collections, deduplicated by name.
    let mut collections: Vec<ExportCollection> = Vec::new();
    let mut category_ids: HashMap<String, String> = HashMap::new();
    let mut prompts = Vec::new();

    for record in records {
        let collection_ids = match record.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => {
                let key = category.to_lowercase();
                let id = category_ids.entry(key).or_insert_with(|| {
                    let id = format!("legacy:{}", collections.len());
                    collections.push(ExportCollection {
                        id: id.clone(),
                        name: category.to_string(),
                        description: String::new(),
                        parent_id: None,
                    });
                    id
                });
                vec![id.clone()]
            }
            _ => Vec::new(),
        };

        prompts.push(ExportPrompt {
            title: record.title,
            collection_ids,
            tags: record.tags.map(LegacyTags::into_names).unwrap_or_default(),
            versions: vec![ExportVersion {
                content: record.content,
                short_content: None,
                usage_example: None,
                variables: Vec::new(),
            }],
        });
    }

    Ok(NormalizedImport { collections, prompts })
}

/// Run the unified import. New records are owned by `owner_id`.
pub fn import_document(
    store: &Store,
    owner_id: &str,
    document: &serde_json::Value,
) -> StoreResult<ImportReport> {
    let normalized = normalize(document)?;
    let tags_before = store.list_tags()?.len();

    // Map existing collections by (lowercase name, parent id) so re-imports
    // land in the same place instead of duplicating the hierarchy.
    let mut existing: HashMap<(String, Option<String>), String> = store
        .list_collections()?
        .into_iter()
        .map(|c| ((c.name.to_lowercase(), c.parent_id), c.id))
        .collect();

    // Recreate the hierarchy parents-first. Collections whose parent never
    // resolves (dangling reference or a cycle in the document) fall back to
    // the root on the final pass.
    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut pending: Vec<ExportCollection> = normalized.collections;
    let mut collections_created = 0usize;
    let mut flatten = false;

    while !pending.is_empty() {
        let mut progressed = false;
        let mut still_pending = Vec::new();

        for collection in pending {
            // None = parent not resolvable yet, Some(None) = root.
            let resolved = match collection.parent_id.as_deref() {
                None => Some(None),
                Some(old_parent) => match id_map.get(old_parent) {
                    Some(new_parent) => Some(Some(new_parent.clone())),
                    None if flatten => Some(None),
                    None => None,
                },
            };
            let Some(parent) = resolved else {
                still_pending.push(collection);
                continue;
            };

            let key = (collection.name.to_lowercase(), parent.clone());
            let new_id = match existing.get(&key) {
                Some(id) => id.clone(),
                None => {
                    let created = store.create_collection(
                        owner_id,
                        &collection.name,
                        &collection.description,
                        parent.as_deref(),
                    )?;
                    collections_created += 1;
                    existing.insert(key, created.id.clone());
                    created.id
                }
            };
            id_map.insert(collection.id.clone(), new_id);
            progressed = true;
        }

        if !progressed && !still_pending.is_empty() {
            flatten = true;
        }
        pending = still_pending;
    }

    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut errors = Vec::new();

    for prompt in normalized.prompts {
        let collection_ids: Vec<String> = prompt
            .collection_ids
            .iter()
            .filter_map(|old| id_map.get(old).cloned())
            .collect();
        let versions: Vec<VersionSeed> = prompt
            .versions
            .iter()
            .map(|v| VersionSeed {
                content: v.content.clone(),
                short_content: v.short_content.clone(),
                usage_example: v.usage_example.clone(),
                variables: v.variables.clone(),
            })
            .collect();

        match store.import_prompt(owner_id, &prompt.title, &collection_ids, &prompt.tags, &versions)
        {
            Ok(_) => imported += 1,
            Err(StoreError::Invalid(reason)) => {
                skipped += 1;
                let title =
                    if prompt.title.trim().is_empty() { "(untitled)" } else { prompt.title.as_str() };
                errors.push(format!("{title}: {reason}"));
            }
            Err(other) => return Err(other),
        }
    }

    store.prune_tags()?;
    let tags_after = store.list_tags()?.len();

    tracing::info!(imported, skipped, collections = collections_created, "import finished");
    Ok(ImportReport {
        imported,
        skipped,
        collections: collections_created,
        tags: tags_after.saturating_sub(tags_before),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;
    use serde_json::json;

    fn seeded() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        (store, user.id)
    }

    #[test]
    fn test_legacy_array_import() {
        let (store, owner) = seeded();
        let doc = json!([
            {"title": "One", "content": "first", "category": "Writing", "tags": "draft, Email"},
            {"title": "Two", "content": "second", "category": "writing", "tags": ["Draft"]},
            {"title": "", "content": "orphan"},
        ]);

        let report = import_document(&store, &owner, &doc).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 1);
        // "Writing" and "writing" collapse into one collection.
        assert_eq!(report.collections, 1);
        assert_eq!(report.errors.len(), 1);

        // "draft"/"Draft" deduplicated case-insensitively.
        let tags = store.list_tags().unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.to_lowercase()).collect();
        assert!(names.contains(&"draft".to_string()));
        assert!(names.contains(&"email".to_string()));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_versioned_import_recreates_hierarchy() {
        let (store, owner) = seeded();
        let doc = json!({
            "format": EXPORT_FORMAT,
            "version": 2,
            "exported_at": Utc::now(),
            "collections": [
                {"id": "c2", "name": "Child", "parent_id": "c1"},
                {"id": "c1", "name": "Parent"},
            ],
            "prompts": [
                {
                    "title": "Nested",
                    "collection_ids": ["c2"],
                    "tags": ["a"],
                    "versions": [
                        {"content": "v1"},
                        {"content": "v2", "short_content": "s"},
                    ]
                }
            ]
        });

        let report = import_document(&store, &owner, &doc).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.collections, 2);

        let tree = store.collection_tree().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].collection.name, "Parent");
        assert_eq!(tree[0].children[0].collection.name, "Child");

        let prompts = store.list_prompts(None, &PromptFilter::default()).unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].head.version_number, 2);
        assert_eq!(prompts[0].head.content, "v2");
    }

    #[test]
    fn test_dangling_parent_flattens_to_root() {
        let (store, owner) = seeded();
        let doc = json!({
            "format": EXPORT_FORMAT,
            "version": 2,
            "exported_at": Utc::now(),
            "collections": [
                {"id": "c1", "name": "Orphan", "parent_id": "missing"},
            ],
            "prompts": []
        });

        import_document(&store, &owner, &doc).unwrap();
        let tree = store.collection_tree().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].collection.parent_id, None);
    }

    #[test]
    fn test_reimport_maps_onto_existing_collections() {
        let (store, owner) = seeded();
        let doc = json!({
            "format": EXPORT_FORMAT,
            "version": 2,
            "exported_at": Utc::now(),
            "collections": [{"id": "x", "name": "Shared"}],
            "prompts": [
                {"title": "P", "collection_ids": ["x"], "versions": [{"content": "c"}]}
            ]
        });

        let first = import_document(&store, &owner, &doc).unwrap();
        assert_eq!(first.collections, 1);
        let second = import_document(&store, &owner, &doc).unwrap();
        assert_eq!(second.collections, 0);
        assert_eq!(store.list_collections().unwrap().len(), 1);
    }

    #[test]
    fn test_unrecognized_format_rejected() {
        let (store, owner) = seeded();
        let err = import_document(&store, &owner, &json!({"version": 99})).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        let err = import_document(&store, &owner, &json!("nope")).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let (store, owner) = seeded();
        let parent = store.create_collection(&owner, "Parent", "", None).unwrap();
        let child = store
            .create_collection(&owner, "Child", "", Some(&parent.id))
            .unwrap();
        store
            .create_prompt(
                &owner,
                NewPrompt {
                    title: "Traveler".into(),
                    content: "original".into(),
                    collection_ids: vec![child.id.clone()],
                    tags: vec!["roundtrip".into()],
                    ..NewPrompt::default()
                },
            )
            .unwrap();

        let document = build_export(&store, "http://localhost:8080").unwrap();
        assert_eq!(document.version, EXPORT_VERSION);

        let (fresh, fresh_owner) = seeded();
        let value = serde_json::to_value(&document).unwrap();
        let report = import_document(&fresh, &fresh_owner, &value).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.collections, 2);
        assert_eq!(report.tags, 1);

        let tree = fresh.collection_tree().unwrap();
        assert_eq!(tree[0].collection.name, "Parent");
        assert_eq!(tree[0].children[0].collection.name, "Child");

        let prompts = fresh.list_prompts(None, &PromptFilter::default()).unwrap();
        assert_eq!(prompts[0].head.content, "original");
        assert_eq!(prompts[0].tags, vec!["roundtrip".to_string()]);
    }
}
