//! Prompt, version history, favorite and attachment operations.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Store, StoreError, StoreResult, new_id, now_str, ts};
use crate::models::{
    Attachment, AttachmentRole, Prompt, PromptDetail, PromptVariable, PromptVersion,
};

fn prompt_from_row(row: &Row<'_>) -> rusqlite::Result<Prompt> {
    Ok(Prompt {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        usage_count: row.get(3)?,
        created_at: ts(row.get(4)?)?,
        updated_at: ts(row.get(5)?)?,
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<PromptVersion> {
    let variables_raw: String = row.get(6)?;
    let variables: Vec<PromptVariable> = serde_json::from_str(&variables_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PromptVersion {
        id: row.get(0)?,
        prompt_id: row.get(1)?,
        version_number: row.get(2)?,
        content: row.get(3)?,
        short_content: row.get(4)?,
        usage_example: row.get(5)?,
        variables,
        created_at: ts(row.get(7)?)?,
    })
}

fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    let role_raw: String = row.get(2)?;
    let role = AttachmentRole::parse(&role_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown attachment role: {role_raw}").into(),
        )
    })?;
    Ok(Attachment {
        id: row.get(0)?,
        version_id: row.get(1)?,
        role,
        filename: row.get(3)?,
        media_type: row.get(4)?,
        size: row.get(5)?,
        created_at: ts(row.get(6)?)?,
    })
}

const PROMPT_COLS: &str = "id, owner_id, title, usage_count, created_at, updated_at";
const VERSION_COLS: &str =
    "id, prompt_id, version_number, content, short_content, usage_example, variables, created_at";
const ATTACHMENT_COLS: &str =
    "id, version_id, role, filename, media_type, LENGTH(data), created_at";

/// Payload for creating a prompt. The first version is created from the
/// content fields; collections and tags are attached by id / name.
#[derive(Debug, Clone, Default)]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    pub short_content: Option<String>,
    pub usage_example: Option<String>,
    pub variables: Vec<PromptVariable>,
    pub collection_ids: Vec<String>,
    pub tags: Vec<String>,
}

/// Partial update. Content-bearing fields that actually change the head
/// version cause a new version to be appended; the history is never
/// rewritten. `short_content`/`usage_example` use a double Option so
/// "clear the field" and "leave it alone" stay distinguishable.
#[derive(Debug, Default)]
pub struct PromptUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub short_content: Option<Option<String>>,
    pub usage_example: Option<Option<String>>,
    pub variables: Option<Vec<PromptVariable>>,
    pub collection_ids: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Listing filters. `collection` takes an id or the literal "unassigned".
#[derive(Debug, Default)]
pub struct PromptFilter {
    pub collection: Option<String>,
    pub tag: Option<String>,
    pub query: Option<String>,
    pub favorites_only: bool,
    pub hidden_collections: Vec<String>,
}

/// One version of an imported prompt, oldest first.
#[derive(Debug, Clone)]
pub struct VersionSeed {
    pub content: String,
    pub short_content: Option<String>,
    pub usage_example: Option<String>,
    pub variables: Vec<PromptVariable>,
}

impl Store {
    pub fn create_prompt(&self, owner_id: &str, new: NewPrompt) -> StoreResult<PromptDetail> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Invalid("prompt title must not be empty".into()));
        }
        if new.content.trim().is_empty() {
            return Err(StoreError::Invalid("prompt content must not be empty".into()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let prompt_id = new_id();
        let now = now_str();
        tx.execute(
            &format!("INSERT INTO prompts ({PROMPT_COLS}) VALUES (?1, ?2, ?3, 0, ?4, ?5)"),
            params![prompt_id, owner_id, title, now, now],
        )?;
        insert_version_conn(
            &tx,
            &prompt_id,
            1,
            &VersionSeed {
                content: new.content,
                short_content: new.short_content,
                usage_example: new.usage_example,
                variables: new.variables,
            },
        )?;
        set_collections_conn(&tx, &prompt_id, &new.collection_ids)?;
        set_tags_conn(&tx, &prompt_id, &new.tags)?;

        let detail = detail_conn(&tx, &prompt_id, None)?.ok_or(StoreError::NotFound("prompt"))?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn get_prompt_detail(
        &self,
        id: &str,
        viewer_id: Option<&str>,
    ) -> StoreResult<Option<PromptDetail>> {
        let conn = self.lock();
        detail_conn(&conn, id, viewer_id)
    }

    pub fn list_prompts(
        &self,
        viewer_id: Option<&str>,
        filter: &PromptFilter,
    ) -> StoreResult<Vec<PromptDetail>> {
        let conn = self.lock();

        let ids: Vec<String> = match (&filter.collection, &filter.tag, filter.favorites_only) {
            (Some(collection), _, _) if collection == "unassigned" => {
                let mut stmt = conn.prepare(
                    "SELECT id FROM prompts
                     WHERE id NOT IN (SELECT prompt_id FROM prompt_collections)
                     ORDER BY updated_at DESC",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            (Some(collection), _, _) => {
                let mut stmt = conn.prepare(
                    "SELECT p.id FROM prompts p
                     JOIN prompt_collections pc ON pc.prompt_id = p.id
                     WHERE pc.collection_id = ?1
                     ORDER BY p.updated_at DESC",
                )?;
                let rows = stmt.query_map([collection.as_str()], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            (None, Some(tag), _) => {
                let mut stmt = conn.prepare(
                    "SELECT p.id FROM prompts p
                     JOIN prompt_tags pt ON pt.prompt_id = p.id
                     JOIN tags t ON t.id = pt.tag_id
                     WHERE t.name = ?1 COLLATE NOCASE
                     ORDER BY p.updated_at DESC",
                )?;
                let rows = stmt.query_map([tag.as_str()], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            (None, None, true) => {
                let viewer = viewer_id.unwrap_or_default();
                let mut stmt = conn.prepare(
                    "SELECT p.id FROM prompts p
                     JOIN favorites f ON f.prompt_id = p.id
                     WHERE f.user_id = ?1
                     ORDER BY p.updated_at DESC",
                )?;
                let rows = stmt.query_map([viewer], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            (None, None, false) => {
                let mut stmt = conn.prepare("SELECT id FROM prompts ORDER BY updated_at DESC")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        let mut details = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(detail) = detail_conn(&conn, &id, viewer_id)? {
                details.push(detail);
            }
        }

        // Secondary filters over the assembled details, for combinations the
        // id query above didn't already narrow.
        if let Some(tag) = &filter.tag {
            if filter.collection.is_some() {
                let needle = tag.to_lowercase();
                details.retain(|d| d.tags.iter().any(|t| t.to_lowercase() == needle));
            }
        }
        if filter.favorites_only && (filter.collection.is_some() || filter.tag.is_some()) {
            details.retain(|d| d.favorite);
        }
        if let Some(query) = &filter.query {
            let needle = query.to_lowercase();
            details.retain(|d| {
                d.prompt.title.to_lowercase().contains(&needle)
                    || d.head.content.to_lowercase().contains(&needle)
            });
        }
        if !filter.hidden_collections.is_empty() {
            // Hide prompts that live exclusively in hidden collections.
            details.retain(|d| {
                d.collection_ids.is_empty()
                    || d.collection_ids
                        .iter()
                        .any(|c| !filter.hidden_collections.contains(c))
            });
        }

        Ok(details)
    }

    pub fn update_prompt(
        &self,
        id: &str,
        viewer_id: Option<&str>,
        update: PromptUpdate,
    ) -> StoreResult<PromptDetail> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM prompts WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound("prompt"));
        }

        if let Some(title) = &update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(StoreError::Invalid("prompt title must not be empty".into()));
            }
            tx.execute("UPDATE prompts SET title = ?1 WHERE id = ?2", params![title, id])?;
        }
        if let Some(collection_ids) = &update.collection_ids {
            tx.execute("DELETE FROM prompt_collections WHERE prompt_id = ?1", [id])?;
            set_collections_conn(&tx, id, collection_ids)?;
        }
        let tags_changed = update.tags.is_some();
        if let Some(tags) = &update.tags {
            tx.execute("DELETE FROM prompt_tags WHERE prompt_id = ?1", [id])?;
            set_tags_conn(&tx, id, tags)?;
        }

        // Content edits append a version instead of mutating history.
        let head = head_version_conn(&tx, id)?.ok_or(StoreError::NotFound("prompt version"))?;
        let next = VersionSeed {
            content: update.content.unwrap_or_else(|| head.content.clone()),
            short_content: update.short_content.unwrap_or_else(|| head.short_content.clone()),
            usage_example: update.usage_example.unwrap_or_else(|| head.usage_example.clone()),
            variables: update.variables.unwrap_or_else(|| head.variables.clone()),
        };
        let content_changed = next.content != head.content
            || next.short_content != head.short_content
            || next.usage_example != head.usage_example
            || next.variables != head.variables;
        if content_changed {
            if next.content.trim().is_empty() {
                return Err(StoreError::Invalid("prompt content must not be empty".into()));
            }
            insert_version_conn(&tx, id, head.version_number + 1, &next)?;
        }

        tx.execute("UPDATE prompts SET updated_at = ?1 WHERE id = ?2", params![now_str(), id])?;

        if tags_changed {
            super::tags::prune_tags_conn(&tx)?;
        }

        let detail = detail_conn(&tx, id, viewer_id)?.ok_or(StoreError::NotFound("prompt"))?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn delete_prompt(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM prompts WHERE id = ?1", [id])?;
        super::tags::prune_tags_conn(&tx)?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Full history, newest first.
    pub fn list_versions(&self, prompt_id: &str) -> StoreResult<Vec<PromptVersion>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLS} FROM prompt_versions
             WHERE prompt_id = ?1 ORDER BY version_number DESC"
        ))?;
        let versions = stmt
            .query_map([prompt_id], version_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    /// Copy version `number`'s contents to a new head version.
    pub fn restore_version(&self, prompt_id: &str, number: i64) -> StoreResult<PromptVersion> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let source = tx
            .query_row(
                &format!(
                    "SELECT {VERSION_COLS} FROM prompt_versions
                     WHERE prompt_id = ?1 AND version_number = ?2"
                ),
                params![prompt_id, number],
                version_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound("prompt version"))?;
        let head = head_version_conn(&tx, prompt_id)?.ok_or(StoreError::NotFound("prompt"))?;

        let restored = insert_version_conn(
            &tx,
            prompt_id,
            head.version_number + 1,
            &VersionSeed {
                content: source.content,
                short_content: source.short_content,
                usage_example: source.usage_example,
                variables: source.variables,
            },
        )?;
        tx.execute(
            "UPDATE prompts SET updated_at = ?1 WHERE id = ?2",
            params![now_str(), prompt_id],
        )?;
        tx.commit()?;
        Ok(restored)
    }

    pub fn set_favorite(&self, user_id: &str, prompt_id: &str, favorite: bool) -> StoreResult<()> {
        let conn = self.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM prompts WHERE id = ?1)",
            [prompt_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound("prompt"));
        }
        if favorite {
            conn.execute(
                "INSERT OR IGNORE INTO favorites (user_id, prompt_id, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, prompt_id, now_str()],
            )?;
        } else {
            conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND prompt_id = ?2",
                params![user_id, prompt_id],
            )?;
        }
        Ok(())
    }

    /// Usage counter for the analytics endpoint. Returns the new count.
    pub fn increment_usage(&self, prompt_id: &str) -> StoreResult<i64> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE prompts SET usage_count = usage_count + 1 WHERE id = ?1",
            [prompt_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound("prompt"));
        }
        Ok(conn.query_row(
            "SELECT usage_count FROM prompts WHERE id = ?1",
            [prompt_id],
            |row| row.get(0),
        )?)
    }

    // ── Attachments ────────────────────────────────────────────────────────

    /// Attach a file to the prompt's head version.
    pub fn add_attachment(
        &self,
        prompt_id: &str,
        role: AttachmentRole,
        filename: &str,
        media_type: &str,
        data: &[u8],
    ) -> StoreResult<Attachment> {
        if filename.trim().is_empty() {
            return Err(StoreError::Invalid("filename must not be empty".into()));
        }
        let conn = self.lock();
        let head = head_version_conn(&conn, prompt_id)?.ok_or(StoreError::NotFound("prompt"))?;

        let attachment = Attachment {
            id: new_id(),
            version_id: head.id.clone(),
            role,
            filename: filename.trim().to_string(),
            media_type: media_type.to_string(),
            size: data.len() as i64,
            created_at: chrono::Utc::now(),
        };
        conn.execute(
            "INSERT INTO attachments (id, version_id, role, filename, media_type, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attachment.id,
                attachment.version_id,
                attachment.role.as_str(),
                attachment.filename,
                attachment.media_type,
                data,
                attachment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(attachment)
    }

    pub fn get_attachment(&self, id: &str) -> StoreResult<Option<(Attachment, Vec<u8>)>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {ATTACHMENT_COLS}, data FROM attachments WHERE id = ?1"),
                [id],
                |row| {
                    let attachment = attachment_from_row(row)?;
                    let data: Vec<u8> = row.get(7)?;
                    Ok((attachment, data))
                },
            )
            .optional()?)
    }

    pub fn delete_attachment(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM attachments WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Insert a prompt with a pre-built version history (import path).
    /// Versions are numbered in the given order, oldest first.
    pub fn import_prompt(
        &self,
        owner_id: &str,
        title: &str,
        collection_ids: &[String],
        tags: &[String],
        versions: &[VersionSeed],
    ) -> StoreResult<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Invalid("prompt title must not be empty".into()));
        }
        if versions.is_empty() || versions.iter().any(|v| v.content.trim().is_empty()) {
            return Err(StoreError::Invalid("prompt content must not be empty".into()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let prompt_id = new_id();
        let now = now_str();
        tx.execute(
            &format!("INSERT INTO prompts ({PROMPT_COLS}) VALUES (?1, ?2, ?3, 0, ?4, ?5)"),
            params![prompt_id, owner_id, title, now, now],
        )?;
        for (index, seed) in versions.iter().enumerate() {
            insert_version_conn(&tx, &prompt_id, index as i64 + 1, seed)?;
        }
        set_collections_conn(&tx, &prompt_id, collection_ids)?;
        set_tags_conn(&tx, &prompt_id, tags)?;

        tx.commit()?;
        Ok(prompt_id)
    }
}

// ── Connection-level helpers (shared with cross-entity transactions) ───────

pub(super) fn head_version_conn(
    conn: &Connection,
    prompt_id: &str,
) -> StoreResult<Option<PromptVersion>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {VERSION_COLS} FROM prompt_versions
                 WHERE prompt_id = ?1 ORDER BY version_number DESC LIMIT 1"
            ),
            [prompt_id],
            version_from_row,
        )
        .optional()?)
}

fn insert_version_conn(
    conn: &Connection,
    prompt_id: &str,
    number: i64,
    seed: &VersionSeed,
) -> StoreResult<PromptVersion> {
    let version = PromptVersion {
        id: new_id(),
        prompt_id: prompt_id.to_string(),
        version_number: number,
        content: seed.content.clone(),
        short_content: seed.short_content.clone(),
        usage_example: seed.usage_example.clone(),
        variables: seed.variables.clone(),
        created_at: chrono::Utc::now(),
    };
    conn.execute(
        &format!("INSERT INTO prompt_versions ({VERSION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            version.id,
            version.prompt_id,
            version.version_number,
            version.content,
            version.short_content,
            version.usage_example,
            serde_json::to_string(&version.variables)?,
            version.created_at.to_rfc3339(),
        ],
    )?;
    Ok(version)
}

fn set_collections_conn(
    conn: &Connection,
    prompt_id: &str,
    collection_ids: &[String],
) -> StoreResult<()> {
    for collection_id in collection_ids {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1)",
            [collection_id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound("collection"));
        }
        conn.execute(
            "INSERT OR IGNORE INTO prompt_collections (prompt_id, collection_id) VALUES (?1, ?2)",
            params![prompt_id, collection_id],
        )?;
    }
    Ok(())
}

fn set_tags_conn(conn: &Connection, prompt_id: &str, tags: &[String]) -> StoreResult<()> {
    for name in tags {
        let Some(tag_id) = super::tags::get_or_create_tag_conn(conn, name)? else {
            continue;
        };
        conn.execute(
            "INSERT OR IGNORE INTO prompt_tags (prompt_id, tag_id) VALUES (?1, ?2)",
            params![prompt_id, tag_id],
        )?;
    }
    Ok(())
}

pub(super) fn detail_conn(
    conn: &Connection,
    prompt_id: &str,
    viewer_id: Option<&str>,
) -> StoreResult<Option<PromptDetail>> {
    let Some(prompt) = conn
        .query_row(
            &format!("SELECT {PROMPT_COLS} FROM prompts WHERE id = ?1"),
            [prompt_id],
            prompt_from_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let Some(head) = head_version_conn(conn, prompt_id)? else {
        // Schema invariant: every prompt has at least one version.
        return Err(StoreError::NotFound("prompt version"));
    };

    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t
         JOIN prompt_tags pt ON pt.tag_id = t.id
         WHERE pt.prompt_id = ?1 ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map([prompt_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT collection_id FROM prompt_collections WHERE prompt_id = ?1 ORDER BY collection_id",
    )?;
    let collection_ids = stmt
        .query_map([prompt_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTACHMENT_COLS} FROM attachments WHERE version_id = ?1 ORDER BY created_at"
    ))?;
    let attachments = stmt
        .query_map([head.id.as_str()], attachment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let favorite = match viewer_id {
        Some(viewer) => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ?1 AND prompt_id = ?2)",
            params![viewer, prompt_id],
            |row| row.get(0),
        )?,
        None => false,
    };

    Ok(Some(PromptDetail { prompt, head, tags, collection_ids, attachments, favorite }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn seeded() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        (store, user.id)
    }

    fn simple_prompt(store: &Store, owner: &str, title: &str) -> PromptDetail {
        store
            .create_prompt(
                owner,
                NewPrompt {
                    title: title.to_string(),
                    content: format!("You are {title}."),
                    tags: vec!["writing".into()],
                    ..NewPrompt::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn test_create_starts_at_version_one() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "Summarizer");
        assert_eq!(detail.head.version_number, 1);
        assert_eq!(detail.tags, vec!["writing".to_string()]);
        assert!(!detail.favorite);
    }

    #[test]
    fn test_empty_content_rejected() {
        let (store, owner) = seeded();
        let err = store
            .create_prompt(
                &owner,
                NewPrompt { title: "T".into(), content: "   ".into(), ..NewPrompt::default() },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_content_edit_appends_version() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "Summarizer");

        let updated = store
            .update_prompt(
                &detail.prompt.id,
                None,
                PromptUpdate { content: Some("Rewritten.".into()), ..PromptUpdate::default() },
            )
            .unwrap();
        assert_eq!(updated.head.version_number, 2);
        assert_eq!(updated.head.content, "Rewritten.");

        // Title-only edits do not grow the history.
        let renamed = store
            .update_prompt(
                &detail.prompt.id,
                None,
                PromptUpdate { title: Some("Short summarizer".into()), ..PromptUpdate::default() },
            )
            .unwrap();
        assert_eq!(renamed.head.version_number, 2);

        let versions = store.list_versions(&detail.prompt.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_number, 2);
    }

    #[test]
    fn test_restore_appends_copy() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "Summarizer");
        store
            .update_prompt(
                &detail.prompt.id,
                None,
                PromptUpdate { content: Some("v2".into()), ..PromptUpdate::default() },
            )
            .unwrap();

        let restored = store.restore_version(&detail.prompt.id, 1).unwrap();
        assert_eq!(restored.version_number, 3);
        assert_eq!(restored.content, "You are Summarizer.");
        assert_eq!(store.list_versions(&detail.prompt.id).unwrap().len(), 3);
    }

    #[test]
    fn test_favorites_and_filter() {
        let (store, owner) = seeded();
        let a = simple_prompt(&store, &owner, "A");
        let _b = simple_prompt(&store, &owner, "B");

        store.set_favorite(&owner, &a.prompt.id, true).unwrap();
        let favorites = store
            .list_prompts(
                Some(&owner),
                &PromptFilter { favorites_only: true, ..PromptFilter::default() },
            )
            .unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].prompt.id, a.prompt.id);
        assert!(favorites[0].favorite);

        store.set_favorite(&owner, &a.prompt.id, false).unwrap();
        let favorites = store
            .list_prompts(
                Some(&owner),
                &PromptFilter { favorites_only: true, ..PromptFilter::default() },
            )
            .unwrap();
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_search_matches_title_and_content() {
        let (store, owner) = seeded();
        simple_prompt(&store, &owner, "Email drafting");
        simple_prompt(&store, &owner, "Code review");

        let hits = store
            .list_prompts(
                None,
                &PromptFilter { query: Some("email".into()), ..PromptFilter::default() },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt.title, "Email drafting");

        // Content match: bodies are "You are <title>."
        let hits = store
            .list_prompts(
                None,
                &PromptFilter { query: Some("you are code".into()), ..PromptFilter::default() },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_unassigned_filter() {
        let (store, owner) = seeded();
        let collection = store.create_collection(&owner, "Inbox", "", None).unwrap();
        store
            .create_prompt(
                &owner,
                NewPrompt {
                    title: "Filed".into(),
                    content: "c".into(),
                    collection_ids: vec![collection.id.clone()],
                    ..NewPrompt::default()
                },
            )
            .unwrap();
        simple_prompt(&store, &owner, "Loose");

        let unassigned = store
            .list_prompts(
                None,
                &PromptFilter { collection: Some("unassigned".into()), ..PromptFilter::default() },
            )
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].prompt.title, "Loose");
    }

    #[test]
    fn test_hidden_collections_filter() {
        let (store, owner) = seeded();
        let secret = store.create_collection(&owner, "Secret", "", None).unwrap();
        store
            .create_prompt(
                &owner,
                NewPrompt {
                    title: "Hidden away".into(),
                    content: "c".into(),
                    collection_ids: vec![secret.id.clone()],
                    ..NewPrompt::default()
                },
            )
            .unwrap();
        simple_prompt(&store, &owner, "Visible");

        let visible = store
            .list_prompts(
                None,
                &PromptFilter {
                    hidden_collections: vec![secret.id.clone()],
                    ..PromptFilter::default()
                },
            )
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].prompt.title, "Visible");
    }

    #[test]
    fn test_usage_increment() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "Counter");
        assert_eq!(store.increment_usage(&detail.prompt.id).unwrap(), 1);
        assert_eq!(store.increment_usage(&detail.prompt.id).unwrap(), 2);
        assert!(matches!(store.increment_usage("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_attachment_roundtrip() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "With file");
        let attachment = store
            .add_attachment(
                &detail.prompt.id,
                AttachmentRole::Result,
                "output.txt",
                "text/plain",
                b"hello",
            )
            .unwrap();
        assert_eq!(attachment.size, 5);

        let (meta, data) = store.get_attachment(&attachment.id).unwrap().unwrap();
        assert_eq!(meta.role, AttachmentRole::Result);
        assert_eq!(data, b"hello");

        assert!(store.delete_attachment(&attachment.id).unwrap());
        assert!(store.get_attachment(&attachment.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_prompt_prunes_tags() {
        let (store, owner) = seeded();
        let detail = simple_prompt(&store, &owner, "Tagged");
        assert!(store.delete_prompt(&detail.prompt.id).unwrap());
        assert!(store.list_tags().unwrap().is_empty());
        assert!(store.list_versions(&detail.prompt.id).unwrap().is_empty());
    }

    #[test]
    fn test_import_prompt_builds_history() {
        let (store, owner) = seeded();
        let id = store
            .import_prompt(
                &owner,
                "Imported",
                &[],
                &["Legacy".into(), "legacy".into()],
                &[
                    VersionSeed {
                        content: "first".into(),
                        short_content: None,
                        usage_example: None,
                        variables: vec![],
                    },
                    VersionSeed {
                        content: "second".into(),
                        short_content: Some("s".into()),
                        usage_example: None,
                        variables: vec![],
                    },
                ],
            )
            .unwrap();

        let detail = store.get_prompt_detail(&id, None).unwrap().unwrap();
        assert_eq!(detail.head.version_number, 2);
        assert_eq!(detail.head.content, "second");
        // Case-insensitive dedup left a single tag.
        assert_eq!(detail.tags.len(), 1);
    }
}
