//! Tag operations. Names are unique case-insensitively; tags that no prompt
//! references anymore are pruned after bulk operations.

use rusqlite::{Connection, OptionalExtension, params};

use super::{Store, StoreError, StoreResult, new_id};
use crate::models::TagCount;

impl Store {
    pub fn list_tags(&self) -> StoreResult<Vec<TagCount>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, COUNT(pt.prompt_id)
             FROM tags t
             LEFT JOIN prompt_tags pt ON pt.tag_id = t.id
             GROUP BY t.id, t.name
             ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagCount { id: row.get(0)?, name: row.get(1)?, prompt_count: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Rename a tag. Renaming onto an existing name (any case) merges the
    /// two: joins move to the surviving tag, the renamed row disappears.
    pub fn rename_tag(&self, id: &str, new_name: &str) -> StoreResult<TagCount> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(StoreError::Invalid("tag name must not be empty".into()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: bool =
            tx.query_row("SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1)", [id], |row| {
                row.get(0)
            })?;
        if !exists {
            return Err(StoreError::NotFound("tag"));
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE AND id <> ?2",
                params![new_name, id],
                |row| row.get(0),
            )
            .optional()?;

        let surviving_id = match existing {
            Some(target_id) => {
                tx.execute(
                    "INSERT OR IGNORE INTO prompt_tags (prompt_id, tag_id)
                     SELECT prompt_id, ?1 FROM prompt_tags WHERE tag_id = ?2",
                    params![target_id, id],
                )?;
                tx.execute("DELETE FROM tags WHERE id = ?1", [id])?;
                target_id
            }
            None => {
                tx.execute("UPDATE tags SET name = ?1 WHERE id = ?2", params![new_name, id])?;
                id.to_string()
            }
        };

        let renamed = tx.query_row(
            "SELECT t.id, t.name, COUNT(pt.prompt_id)
             FROM tags t LEFT JOIN prompt_tags pt ON pt.tag_id = t.id
             WHERE t.id = ?1 GROUP BY t.id, t.name",
            [surviving_id.as_str()],
            |row| Ok(TagCount { id: row.get(0)?, name: row.get(1)?, prompt_count: row.get(2)? }),
        )?;
        tx.commit()?;
        Ok(renamed)
    }

    pub fn delete_tag(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM tags WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Drop tags no prompt references. Returns how many were removed.
    pub fn prune_tags(&self) -> StoreResult<usize> {
        let conn = self.lock();
        Ok(prune_tags_conn(&conn)?)
    }
}

pub(super) fn prune_tags_conn(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM prompt_tags)",
        [],
    )
}

/// Find a tag by name (case-insensitive) or create it. Blank names are
/// skipped rather than rejected so sloppy import data doesn't fail whole
/// records.
pub(super) fn get_or_create_tag_conn(
    conn: &Connection,
    name: &str,
) -> rusqlite::Result<Option<String>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let existing: Option<String> = conn
        .query_row("SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE", [name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(Some(id));
    }
    let id = new_id();
    conn.execute("INSERT INTO tags (id, name) VALUES (?1, ?2)", params![id, name])?;
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;

    fn seeded_with_prompt(tags: &[&str]) -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        let prompt = store
            .create_prompt(
                &user.id,
                NewPrompt {
                    title: "Tagged".into(),
                    content: "c".into(),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..NewPrompt::default()
                },
            )
            .unwrap();
        (store, prompt.prompt.id)
    }

    #[test]
    fn test_list_with_counts() {
        let (store, _) = seeded_with_prompt(&["alpha", "beta"]);
        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.prompt_count == 1));
    }

    #[test]
    fn test_rename_plain() {
        let (store, _) = seeded_with_prompt(&["alpha"]);
        let id = store.list_tags().unwrap()[0].id.clone();
        let renamed = store.rename_tag(&id, "omega").unwrap();
        assert_eq!(renamed.name, "omega");
        assert_eq!(renamed.prompt_count, 1);
    }

    #[test]
    fn test_rename_onto_existing_merges() {
        let (store, prompt_id) = seeded_with_prompt(&["alpha", "beta"]);
        let tags = store.list_tags().unwrap();
        let alpha = tags.iter().find(|t| t.name == "alpha").unwrap().id.clone();

        let merged = store.rename_tag(&alpha, "BETA").unwrap();
        assert_eq!(merged.name.to_lowercase(), "beta");
        assert_eq!(merged.prompt_count, 1);
        assert_eq!(store.list_tags().unwrap().len(), 1);

        let detail = store.get_prompt_detail(&prompt_id, None).unwrap().unwrap();
        assert_eq!(detail.tags.len(), 1);
    }

    #[test]
    fn test_delete_and_prune() {
        let (store, prompt_id) = seeded_with_prompt(&["alpha"]);
        store.delete_prompt(&prompt_id).unwrap();
        // delete_prompt already pruned; nothing left to do.
        assert_eq!(store.prune_tags().unwrap(), 0);
        assert!(store.list_tags().unwrap().is_empty());
    }
}
