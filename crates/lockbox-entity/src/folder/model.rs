//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tree::TreeRow;

/// Id of the single root folder.
pub const ROOT_FOLDER_ID: &str = "0";

/// Id of the folder under which every personal folder lives.
pub const PERSONAL_ROOT_ID: &str = "P";

/// A folder in the secrets hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: String,
    /// Display name.
    pub description: String,
    /// Parent folder id (null only for the root).
    pub parent: Option<String>,
    /// Whether this folder belongs to one user's personal area.
    pub personal: bool,
    /// Owning user for personal folders.
    pub user_id: Option<String>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Build a new shared folder under `parent`.
    pub fn new(id: String, description: String, parent: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            description,
            parent: Some(parent),
            personal: false,
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a personal folder owned by `user_id`.
    pub fn new_personal(id: String, description: String, parent: String, user_id: String) -> Self {
        Self {
            personal: true,
            user_id: Some(user_id),
            ..Self::new(id, description, parent)
        }
    }

    /// The fixed root folder row.
    pub fn root() -> Self {
        Self {
            parent: None,
            ..Self::new(ROOT_FOLDER_ID.to_string(), "Root".to_string(), String::new())
        }
    }

    /// The fixed personal-root folder row.
    pub fn personal_root() -> Self {
        Self::new(
            PERSONAL_ROOT_ID.to_string(),
            "Personal folders".to_string(),
            ROOT_FOLDER_ID.to_string(),
        )
    }

    /// Check if this is the root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Root and personal-root cannot be renamed, moved, or deleted.
    pub fn is_fixed(&self) -> bool {
        self.id == ROOT_FOLDER_ID || self.id == PERSONAL_ROOT_ID
    }

    /// Whether `user_id` owns this personal folder.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.personal && self.user_id.as_deref() == Some(user_id)
    }
}

impl TreeRow for Folder {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn label(&self) -> &str {
        &self.description
    }
}
