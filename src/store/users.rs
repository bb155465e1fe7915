//! Account, per-user settings and global configuration operations.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Store, StoreError, StoreResult, new_id, ts};
use crate::models::{GlobalConfiguration, Role, Settings, User};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(4)?;
    let role = Role::parse(&role_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_raw}").into(),
        )
    })?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        created_at: ts(row.get(5)?)?,
    })
}

const USER_COLS: &str = "id, username, email, password_hash, role, created_at";

impl Store {
    /// Insert a new account. Uniqueness violations surface as conflicts with
    /// the messages the dashboard shows verbatim.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<User> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(StoreError::Invalid("username must not be empty".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid("a valid email is required".into()));
        }

        let conn = self.lock();
        let email_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE)",
            [email],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        let name_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 COLLATE NOCASE)",
            [username],
            |row| row.get(0),
        )?;
        if name_taken {
            return Err(StoreError::Conflict("Username already taken".into()));
        }

        let user = User {
            id: new_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: chrono::Utc::now(),
        };
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.username,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(user)
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    pub fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?)
    }

    /// Look an account up by username or email (the login form accepts both).
    pub fn find_account(&self, login: &str) -> StoreResult<Option<User>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {USER_COLS} FROM users
                     WHERE username = ?1 COLLATE NOCASE OR email = ?1 COLLATE NOCASE"
                ),
                [login.trim()],
                user_from_row,
            )
            .optional()?)
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY created_at"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn update_user_role(&self, id: &str, role: Role) -> StoreResult<User> {
        let conn = self.lock();
        let current = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound("user"))?;

        if current.role == Role::Admin && role != Role::Admin && admin_count(&conn)? <= 1 {
            return Err(StoreError::Conflict(
                "Cannot demote the last remaining admin".into(),
            ));
        }

        conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", params![role.as_str(), id])?;
        Ok(User { role, ..current })
    }

    /// Delete an account with everything it owns: prompts (versions,
    /// attachments and joins cascade), collections (children of other owners
    /// move to the root), favorites and settings. Tags are pruned afterwards.
    pub fn delete_user(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let role_raw: Option<String> = tx
            .query_row("SELECT role FROM users WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        let Some(role_raw) = role_raw else {
            return Err(StoreError::NotFound("user"));
        };
        if role_raw == Role::Admin.as_str() && admin_count(&tx)? <= 1 {
            return Err(StoreError::Conflict(
                "Cannot delete the last remaining admin".into(),
            ));
        }

        tx.execute("DELETE FROM prompts WHERE owner_id = ?1", [id])?;
        tx.execute("DELETE FROM workflows WHERE owner_id = ?1", [id])?;
        // Detach children first: the self-referential FK does not cascade.
        tx.execute(
            "UPDATE collections SET parent_id = NULL
             WHERE parent_id IN (SELECT id FROM collections WHERE owner_id = ?1)",
            [id],
        )?;
        tx.execute("DELETE FROM collections WHERE owner_id = ?1", [id])?;
        tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
        super::tags::prune_tags_conn(&tx)?;

        tx.commit()?;
        Ok(())
    }

    // ── Settings ───────────────────────────────────────────────────────────

    pub fn get_settings(&self, user_id: &str) -> StoreResult<Settings> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT hidden_collections, hidden_users, locale, theme
                 FROM settings WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((hidden_collections, hidden_users, locale, theme)) => Ok(Settings {
                user_id: user_id.to_string(),
                hidden_collections: serde_json::from_str(&hidden_collections)?,
                hidden_users: serde_json::from_str(&hidden_users)?,
                locale,
                theme,
            }),
            None => Ok(Settings::defaults(user_id)),
        }
    }

    pub fn update_settings(&self, settings: &Settings) -> StoreResult<Settings> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO settings (user_id, hidden_collections, hidden_users, locale, theme)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                 hidden_collections = excluded.hidden_collections,
                 hidden_users = excluded.hidden_users,
                 locale = excluded.locale,
                 theme = excluded.theme",
            params![
                settings.user_id,
                serde_json::to_string(&settings.hidden_collections)?,
                serde_json::to_string(&settings.hidden_users)?,
                settings.locale,
                settings.theme,
            ],
        )?;
        Ok(settings.clone())
    }

    // ── Global configuration ───────────────────────────────────────────────

    pub fn get_global_config(&self) -> StoreResult<GlobalConfiguration> {
        let conn = self.lock();
        Ok(conn.query_row(
            "SELECT allow_registration, enable_scraping, enable_backups
             FROM global_config WHERE id = 1",
            [],
            |row| {
                Ok(GlobalConfiguration {
                    allow_registration: row.get(0)?,
                    enable_scraping: row.get(1)?,
                    enable_backups: row.get(2)?,
                })
            },
        )?)
    }

    pub fn update_global_config(&self, config: &GlobalConfiguration) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE global_config
             SET allow_registration = ?1, enable_scraping = ?2, enable_backups = ?3
             WHERE id = 1",
            params![config.allow_registration, config.enable_scraping, config.enable_backups],
        )?;
        Ok(())
    }
}

fn admin_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        [Role::Admin.as_str()],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_admin() -> (Store, User) {
        let store = Store::open_in_memory().unwrap();
        let admin = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        (store, admin)
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (store, _) = store_with_admin();
        let err = store
            .create_user("bob", "alice@example.com", "hash", Role::User)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg == "Email already registered"));
    }

    #[test]
    fn test_duplicate_username_rejected_case_insensitively() {
        let (store, _) = store_with_admin();
        let err = store
            .create_user("ALICE", "other@example.com", "hash", Role::User)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg == "Username already taken"));
    }

    #[test]
    fn test_find_account_by_username_or_email() {
        let (store, admin) = store_with_admin();
        assert_eq!(store.find_account("alice").unwrap().unwrap().id, admin.id);
        assert_eq!(
            store.find_account("Alice@Example.com").unwrap().unwrap().id,
            admin.id
        );
        assert!(store.find_account("nobody").unwrap().is_none());
    }

    #[test]
    fn test_last_admin_cannot_be_demoted_or_deleted() {
        let (store, admin) = store_with_admin();
        assert!(matches!(
            store.update_user_role(&admin.id, Role::User),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(store.delete_user(&admin.id), Err(StoreError::Conflict(_))));

        // With a second admin, demotion goes through.
        store
            .create_user("root", "root@example.com", "hash", Role::Admin)
            .unwrap();
        let updated = store.update_user_role(&admin.id, Role::Guest).unwrap();
        assert_eq!(updated.role, Role::Guest);
    }

    #[test]
    fn test_settings_default_then_roundtrip() {
        let (store, admin) = store_with_admin();
        let settings = store.get_settings(&admin.id).unwrap();
        assert!(settings.hidden_collections.is_empty());
        assert_eq!(settings.locale, "en");

        let mut updated = settings;
        updated.hidden_collections = vec!["c1".into()];
        updated.theme = "dark".into();
        store.update_settings(&updated).unwrap();

        let reread = store.get_settings(&admin.id).unwrap();
        assert_eq!(reread.hidden_collections, vec!["c1".to_string()]);
        assert_eq!(reread.theme, "dark");
    }

    #[test]
    fn test_global_config_roundtrip() {
        let (store, _) = store_with_admin();
        let mut config = store.get_global_config().unwrap();
        assert!(config.allow_registration);

        config.allow_registration = false;
        config.enable_backups = false;
        store.update_global_config(&config).unwrap();

        let reread = store.get_global_config().unwrap();
        assert!(!reread.allow_registration);
        assert!(reread.enable_scraping);
        assert!(!reread.enable_backups);
    }

    #[test]
    fn test_delete_user_cascades() {
        let (store, admin) = store_with_admin();
        let bob = store
            .create_user("bob", "bob@example.com", "hash", Role::User)
            .unwrap();
        store
            .update_settings(&Settings::defaults(&bob.id))
            .unwrap();

        store.delete_user(&bob.id).unwrap();
        assert!(store.get_user(&bob.id).unwrap().is_none());
        // Admin unaffected.
        assert!(store.get_user(&admin.id).unwrap().is_some());
    }
}
