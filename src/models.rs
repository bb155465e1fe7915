use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Accounts ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Guest => "GUEST",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            "GUEST" => Some(Role::Guest),
            _ => None,
        }
    }

    /// Guests are read-only; everyone else may create and edit.
    pub fn can_write(&self) -> bool {
        !matches!(self, Role::Guest)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash — never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Per-user preferences. Created lazily with defaults on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: String,
    /// Collection ids filtered out of listings for this user.
    #[serde(default)]
    pub hidden_collections: Vec<String>,
    /// User ids whose content this user prefers not to see.
    #[serde(default)]
    pub hidden_users: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_theme() -> String {
    "system".to_string()
}

impl Settings {
    pub fn defaults(user_id: &str) -> Self {
        Settings {
            user_id: user_id.to_string(),
            hidden_collections: Vec::new(),
            hidden_users: Vec::new(),
            locale: default_locale(),
            theme: default_theme(),
        }
    }
}

/// Singleton feature flags, editable by admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfiguration {
    pub allow_registration: bool,
    pub enable_scraping: bool,
    pub enable_backups: bool,
}

impl Default for GlobalConfiguration {
    fn default() -> Self {
        GlobalConfiguration {
            allow_registration: true,
            enable_scraping: true,
            enable_backups: true,
        }
    }
}

// ── Collections ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One node of the collection tree returned by the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionNode {
    #[serde(flatten)]
    pub collection: Collection,
    pub children: Vec<CollectionNode>,
    pub prompt_count: i64,
}

/// Outcome of a recursive collection delete.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDeleteReport {
    pub collections_deleted: usize,
    pub prompts_deleted: usize,
    pub prompts_detached: usize,
    pub tags_pruned: usize,
}

// ── Prompts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A placeholder a prompt's content can reference, e.g. `{{topic}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVariable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One immutable snapshot in a prompt's edit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: String,
    pub prompt_id: String,
    pub version_number: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_example: Option<String>,
    #[serde(default)]
    pub variables: Vec<PromptVariable>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttachmentRole {
    Attachment,
    Result,
}

impl AttachmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentRole::Attachment => "ATTACHMENT",
            AttachmentRole::Result => "RESULT",
        }
    }

    pub fn parse(s: &str) -> Option<AttachmentRole> {
        match s {
            "ATTACHMENT" => Some(AttachmentRole::Attachment),
            "RESULT" => Some(AttachmentRole::Result),
            _ => None,
        }
    }
}

/// File attached to a prompt version. Bytes live in the store and are
/// fetched separately from this metadata view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub version_id: String,
    pub role: AttachmentRole,
    pub filename: String,
    pub media_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Prompt together with everything the dashboard shows in one card.
#[derive(Debug, Clone, Serialize)]
pub struct PromptDetail {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub head: PromptVersion,
    pub tags: Vec<String>,
    pub collection_ids: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub id: String,
    pub name: String,
    pub prompt_count: i64,
}

// ── Workflows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub prompt_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Ordered list of prompt references, run top to bottom by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Admin, Role::User, Role::Guest] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("SUPERUSER"), None);
    }

    #[test]
    fn test_guest_is_read_only() {
        assert!(!Role::Guest.can_write());
        assert!(Role::User.can_write());
        assert!(Role::Admin.can_write());
    }

    #[test]
    fn test_role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::Guest).unwrap(), "\"GUEST\"");
    }

    #[test]
    fn test_attachment_role_parse() {
        assert_eq!(AttachmentRole::parse("RESULT"), Some(AttachmentRole::Result));
        assert_eq!(AttachmentRole::parse("result"), None);
    }
}
