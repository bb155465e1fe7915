//! Collection tree operations, including the recursive delete.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Store, StoreError, StoreResult, new_id, now_str, ts};
use crate::models::{Collection, CollectionDeleteReport, CollectionNode};

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: ts(row.get(5)?)?,
        updated_at: ts(row.get(6)?)?,
    })
}

const COLLECTION_COLS: &str = "id, name, description, parent_id, owner_id, created_at, updated_at";

/// Fields a collection update may change. `parent_id` distinguishes
/// "leave as is" (None) from "move to root" (Some(None)).
#[derive(Debug, Default)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<String>>,
}

impl Store {
    pub fn create_collection(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
        parent_id: Option<&str>,
    ) -> StoreResult<Collection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("collection name must not be empty".into()));
        }

        let conn = self.lock();
        if let Some(parent) = parent_id {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1)",
                [parent],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound("parent collection"));
            }
        }

        let now = chrono::Utc::now();
        let collection = Collection {
            id: new_id(),
            name: name.to_string(),
            description: description.trim().to_string(),
            parent_id: parent_id.map(String::from),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            &format!("INSERT INTO collections ({COLLECTION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                collection.id,
                collection.name,
                collection.description,
                collection.parent_id,
                collection.owner_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(collection)
    }

    pub fn get_collection(&self, id: &str) -> StoreResult<Option<Collection>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {COLLECTION_COLS} FROM collections WHERE id = ?1"),
                [id],
                collection_from_row,
            )
            .optional()?)
    }

    pub fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT {COLLECTION_COLS} FROM collections ORDER BY name"))?;
        let collections = stmt
            .query_map([], collection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(collections)
    }

    pub fn children_of(&self, id: &str) -> StoreResult<Vec<Collection>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLLECTION_COLS} FROM collections WHERE parent_id = ?1 ORDER BY name"
        ))?;
        let children = stmt
            .query_map([id], collection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    /// The whole forest as nested nodes with per-collection prompt counts.
    pub fn collection_tree(&self) -> StoreResult<Vec<CollectionNode>> {
        let all = self.list_collections()?;

        let counts: HashMap<String, i64> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT collection_id, COUNT(*) FROM prompt_collections GROUP BY collection_id",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().collect()
        };

        let mut children_of: HashMap<Option<String>, Vec<Collection>> = HashMap::new();
        for collection in all {
            children_of
                .entry(collection.parent_id.clone())
                .or_default()
                .push(collection);
        }

        fn build(
            parent: Option<&str>,
            children_of: &HashMap<Option<String>, Vec<Collection>>,
            counts: &HashMap<String, i64>,
        ) -> Vec<CollectionNode> {
            children_of
                .get(&parent.map(String::from))
                .map(|nodes| {
                    nodes
                        .iter()
                        .map(|c| CollectionNode {
                            children: build(Some(&c.id), children_of, counts),
                            prompt_count: counts.get(&c.id).copied().unwrap_or(0),
                            collection: c.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        Ok(build(None, &children_of, &counts))
    }

    /// Rename / re-parent. Moving a collection under itself or any of its
    /// descendants is rejected to keep the parent chain acyclic.
    pub fn update_collection(&self, id: &str, update: CollectionUpdate) -> StoreResult<Collection> {
        let conn = self.lock();
        let mut current = conn
            .query_row(
                &format!("SELECT {COLLECTION_COLS} FROM collections WHERE id = ?1"),
                [id],
                collection_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound("collection"))?;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(StoreError::Invalid("collection name must not be empty".into()));
            }
            current.name = name;
        }
        if let Some(description) = update.description {
            current.description = description.trim().to_string();
        }
        if let Some(new_parent) = update.parent_id {
            if let Some(parent) = &new_parent {
                if parent == id {
                    return Err(StoreError::Invalid(
                        "a collection cannot be its own parent".into(),
                    ));
                }
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1)",
                    [parent.as_str()],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(StoreError::NotFound("parent collection"));
                }
                ensure_not_descendant(&conn, id, parent)?;
            }
            current.parent_id = new_parent;
        }

        conn.execute(
            "UPDATE collections SET name = ?1, description = ?2, parent_id = ?3, updated_at = ?4
             WHERE id = ?5",
            params![current.name, current.description, current.parent_id, now_str(), id],
        )?;
        Ok(current)
    }

    /// Recursive delete. Walks the subtree depth-first collecting every
    /// descendant collection and every prompt attached to any of them; with
    /// `delete_prompts` the prompts go too, otherwise they are detached and
    /// left unassigned. Collections are removed leaf-first, then tags with
    /// no remaining prompts are pruned.
    pub fn delete_collection(
        &self,
        id: &str,
        delete_prompts: bool,
    ) -> StoreResult<CollectionDeleteReport> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound("collection"));
        }

        let ordered = descendants_conn(&tx, id)?;

        let mut prompt_ids: BTreeSet<String> = BTreeSet::new();
        {
            let mut stmt =
                tx.prepare("SELECT prompt_id FROM prompt_collections WHERE collection_id = ?1")?;
            for cid in &ordered {
                let ids = stmt
                    .query_map([cid], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                prompt_ids.extend(ids);
            }
        }

        let (prompts_deleted, prompts_detached) = if delete_prompts {
            for pid in &prompt_ids {
                tx.execute("DELETE FROM prompts WHERE id = ?1", [pid.as_str()])?;
            }
            (prompt_ids.len(), 0)
        } else {
            for cid in &ordered {
                tx.execute(
                    "DELETE FROM prompt_collections WHERE collection_id = ?1",
                    [cid.as_str()],
                )?;
            }
            (0, prompt_ids.len())
        };

        // Leaf-first so the self-referential FK never sees a dangling parent.
        for cid in ordered.iter().rev() {
            tx.execute("DELETE FROM collections WHERE id = ?1", [cid.as_str()])?;
        }

        let tags_pruned = super::tags::prune_tags_conn(&tx)?;
        tx.commit()?;

        Ok(CollectionDeleteReport {
            collections_deleted: ordered.len(),
            prompts_deleted,
            prompts_detached,
            tags_pruned,
        })
    }
}

/// Depth-first preorder walk of the subtree rooted at `root` (root included,
/// parents before children). A visited guard keeps corrupted parent chains
/// from looping forever.
fn descendants_conn(conn: &Connection, root: &str) -> rusqlite::Result<Vec<String>> {
    let mut ordered = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack = vec![root.to_string()];

    let mut stmt =
        conn.prepare("SELECT id FROM collections WHERE parent_id = ?1 ORDER BY name DESC")?;

    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let children = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ordered.push(id);
        stack.extend(children);
    }

    Ok(ordered)
}

/// Reject `candidate_parent` when it sits anywhere below `id`.
fn ensure_not_descendant(
    conn: &Connection,
    id: &str,
    candidate_parent: &str,
) -> StoreResult<()> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = Some(candidate_parent.to_string());
    while let Some(current) = cursor {
        if current == id {
            return Err(StoreError::Invalid(
                "cannot move a collection under its own descendant".into(),
            ));
        }
        if !seen.insert(current.clone()) {
            break;
        }
        cursor = conn
            .query_row(
                "SELECT parent_id FROM collections WHERE id = ?1",
                [current.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;

    fn seeded() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        (store, user.id)
    }

    fn prompt_in(store: &Store, owner: &str, title: &str, collection: &str, tags: &[&str]) -> String {
        store
            .create_prompt(
                owner,
                NewPrompt {
                    title: title.to_string(),
                    content: format!("content of {title}"),
                    collection_ids: vec![collection.to_string()],
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..NewPrompt::default()
                },
            )
            .unwrap()
            .prompt
            .id
    }

    #[test]
    fn test_tree_nesting_and_counts() {
        let (store, owner) = seeded();
        let root = store.create_collection(&owner, "Writing", "", None).unwrap();
        let child = store
            .create_collection(&owner, "Blog", "", Some(&root.id))
            .unwrap();
        prompt_in(&store, &owner, "Outline", &child.id, &[]);

        let tree = store.collection_tree().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].collection.name, "Writing");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].collection.id, child.id);
        assert_eq!(tree[0].children[0].prompt_count, 1);
    }

    #[test]
    fn test_reparent_cycle_rejected() {
        let (store, owner) = seeded();
        let a = store.create_collection(&owner, "A", "", None).unwrap();
        let b = store.create_collection(&owner, "B", "", Some(&a.id)).unwrap();
        let c = store.create_collection(&owner, "C", "", Some(&b.id)).unwrap();

        // A under its grandchild C: cycle.
        let err = store
            .update_collection(
                &a.id,
                CollectionUpdate { parent_id: Some(Some(c.id.clone())), ..Default::default() },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        // A under itself.
        let err = store
            .update_collection(
                &a.id,
                CollectionUpdate { parent_id: Some(Some(a.id.clone())), ..Default::default() },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        // Moving C to the root is fine.
        let moved = store
            .update_collection(
                &c.id,
                CollectionUpdate { parent_id: Some(None), ..Default::default() },
            )
            .unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn test_recursive_delete_detaches_prompts() {
        let (store, owner) = seeded();
        let root = store.create_collection(&owner, "Root", "", None).unwrap();
        let child = store
            .create_collection(&owner, "Child", "", Some(&root.id))
            .unwrap();
        let kept = prompt_in(&store, &owner, "Kept", &child.id, &["shared"]);

        let report = store.delete_collection(&root.id, false).unwrap();
        assert_eq!(report.collections_deleted, 2);
        assert_eq!(report.prompts_detached, 1);
        assert_eq!(report.prompts_deleted, 0);

        // Prompt survives, unassigned.
        let detail = store.get_prompt_detail(&kept, None).unwrap().unwrap();
        assert!(detail.collection_ids.is_empty());
        // Its tag is still referenced, so not pruned.
        assert_eq!(report.tags_pruned, 0);
        assert!(store.get_collection(&root.id).unwrap().is_none());
        assert!(store.get_collection(&child.id).unwrap().is_none());
    }

    #[test]
    fn test_recursive_delete_cascades_prompts_and_prunes_tags() {
        let (store, owner) = seeded();
        let root = store.create_collection(&owner, "Root", "", None).unwrap();
        let child = store
            .create_collection(&owner, "Child", "", Some(&root.id))
            .unwrap();
        let grandchild = store
            .create_collection(&owner, "Grandchild", "", Some(&child.id))
            .unwrap();
        let doomed = prompt_in(&store, &owner, "Doomed", &grandchild.id, &["only-here"]);
        let outside = store.create_collection(&owner, "Outside", "", None).unwrap();
        let survivor = prompt_in(&store, &owner, "Survivor", &outside.id, &["kept"]);

        let report = store.delete_collection(&root.id, true).unwrap();
        assert_eq!(report.collections_deleted, 3);
        assert_eq!(report.prompts_deleted, 1);
        assert_eq!(report.tags_pruned, 1);

        assert!(store.get_prompt_detail(&doomed, None).unwrap().is_none());
        assert!(store.get_prompt_detail(&survivor, None).unwrap().is_some());
        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "kept");
    }

    #[test]
    fn test_delete_missing_collection_is_not_found() {
        let (store, _) = seeded();
        assert!(matches!(
            store.delete_collection("nope", true),
            Err(StoreError::NotFound(_))
        ));
    }
}
