//! Workflow operations: ordered prompt references, replaced wholesale on
//! update.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Store, StoreError, StoreResult, new_id, now_str, ts};
use crate::models::{Workflow, WorkflowStep};

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        steps: Vec::new(),
        created_at: ts(row.get(4)?)?,
        updated_at: ts(row.get(5)?)?,
    })
}

const WORKFLOW_COLS: &str = "id, owner_id, name, description, created_at, updated_at";

impl Store {
    pub fn create_workflow(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
        steps: &[WorkflowStep],
    ) -> StoreResult<Workflow> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("workflow name must not be empty".into()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let now = now_str();
        let id = new_id();
        tx.execute(
            &format!("INSERT INTO workflows ({WORKFLOW_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![id, owner_id, name, description.trim(), now, now],
        )?;
        replace_steps_conn(&tx, &id, steps)?;

        let workflow = load_workflow_conn(&tx, &id)?.ok_or(StoreError::NotFound("workflow"))?;
        tx.commit()?;
        Ok(workflow)
    }

    pub fn get_workflow(&self, id: &str) -> StoreResult<Option<Workflow>> {
        let conn = self.lock();
        load_workflow_conn(&conn, id)
    }

    pub fn list_workflows(&self) -> StoreResult<Vec<Workflow>> {
        let conn = self.lock();
        let ids: Vec<String> = {
            let mut stmt = conn.prepare("SELECT id FROM workflows ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut workflows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(workflow) = load_workflow_conn(&conn, &id)? {
                workflows.push(workflow);
            }
        }
        Ok(workflows)
    }

    pub fn update_workflow(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        steps: Option<&[WorkflowStep]>,
    ) -> StoreResult<Workflow> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM workflows WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound("workflow"));
        }

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::Invalid("workflow name must not be empty".into()));
            }
            tx.execute("UPDATE workflows SET name = ?1 WHERE id = ?2", params![name, id])?;
        }
        if let Some(description) = description {
            tx.execute(
                "UPDATE workflows SET description = ?1 WHERE id = ?2",
                params![description.trim(), id],
            )?;
        }
        if let Some(steps) = steps {
            tx.execute("DELETE FROM workflow_steps WHERE workflow_id = ?1", [id])?;
            replace_steps_conn(&tx, id, steps)?;
        }
        tx.execute("UPDATE workflows SET updated_at = ?1 WHERE id = ?2", params![now_str(), id])?;

        let workflow = load_workflow_conn(&tx, id)?.ok_or(StoreError::NotFound("workflow"))?;
        tx.commit()?;
        Ok(workflow)
    }

    pub fn delete_workflow(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM workflows WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

fn replace_steps_conn(conn: &Connection, workflow_id: &str, steps: &[WorkflowStep]) -> StoreResult<()> {
    for (position, step) in steps.iter().enumerate() {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM prompts WHERE id = ?1)",
            [step.prompt_id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::Invalid(format!(
                "workflow step {} references a missing prompt",
                position + 1
            )));
        }
        conn.execute(
            "INSERT INTO workflow_steps (workflow_id, position, prompt_id, note)
             VALUES (?1, ?2, ?3, ?4)",
            params![workflow_id, position as i64, step.prompt_id, step.note],
        )?;
    }
    Ok(())
}

fn load_workflow_conn(conn: &Connection, id: &str) -> StoreResult<Option<Workflow>> {
    let Some(mut workflow) = conn
        .query_row(
            &format!("SELECT {WORKFLOW_COLS} FROM workflows WHERE id = ?1"),
            [id],
            workflow_from_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT prompt_id, note FROM workflow_steps WHERE workflow_id = ?1 ORDER BY position",
    )?;
    workflow.steps = stmt
        .query_map([id], |row| {
            Ok(WorkflowStep { prompt_id: row.get(0)?, note: row.get(1)? })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(workflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;

    fn seeded() -> (Store, String, String, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        let first = store
            .create_prompt(
                &user.id,
                NewPrompt { title: "First".into(), content: "a".into(), ..NewPrompt::default() },
            )
            .unwrap()
            .prompt
            .id;
        let second = store
            .create_prompt(
                &user.id,
                NewPrompt { title: "Second".into(), content: "b".into(), ..NewPrompt::default() },
            )
            .unwrap()
            .prompt
            .id;
        (store, user.id, first, second)
    }

    #[test]
    fn test_steps_keep_order() {
        let (store, owner, first, second) = seeded();
        let workflow = store
            .create_workflow(
                &owner,
                "Draft then review",
                "",
                &[
                    WorkflowStep { prompt_id: second.clone(), note: Some("draft".into()) },
                    WorkflowStep { prompt_id: first.clone(), note: None },
                ],
            )
            .unwrap();
        assert_eq!(workflow.steps.len(), 2);
        assert_eq!(workflow.steps[0].prompt_id, second);
        assert_eq!(workflow.steps[1].prompt_id, first);
    }

    #[test]
    fn test_missing_prompt_rejected() {
        let (store, owner, _, _) = seeded();
        let err = store
            .create_workflow(
                &owner,
                "Broken",
                "",
                &[WorkflowStep { prompt_id: "ghost".into(), note: None }],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_update_replaces_steps() {
        let (store, owner, first, second) = seeded();
        let workflow = store
            .create_workflow(
                &owner,
                "W",
                "",
                &[WorkflowStep { prompt_id: first, note: None }],
            )
            .unwrap();

        let updated = store
            .update_workflow(
                &workflow.id,
                Some("W2"),
                None,
                Some(&[WorkflowStep { prompt_id: second.clone(), note: None }]),
            )
            .unwrap();
        assert_eq!(updated.name, "W2");
        assert_eq!(updated.steps.len(), 1);
        assert_eq!(updated.steps[0].prompt_id, second);
    }

    #[test]
    fn test_deleting_prompt_removes_steps() {
        let (store, owner, first, second) = seeded();
        let workflow = store
            .create_workflow(
                &owner,
                "W",
                "",
                &[
                    WorkflowStep { prompt_id: first.clone(), note: None },
                    WorkflowStep { prompt_id: second, note: None },
                ],
            )
            .unwrap();

        store.delete_prompt(&first).unwrap();
        let reread = store.get_workflow(&workflow.id).unwrap().unwrap();
        assert_eq!(reread.steps.len(), 1);
    }
}
