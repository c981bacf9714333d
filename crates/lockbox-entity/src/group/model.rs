//! Group entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tree::TreeRow;

/// Id of the root group.
pub const ROOT_GROUP_ID: &str = "0";

/// Id of the administrators group.
pub const ADMINS_GROUP_ID: &str = "A";

/// Id of the group every user belongs to.
pub const EVERYONE_GROUP_ID: &str = "E";

/// A group of users, the subject of folder permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Unique group identifier.
    pub id: String,
    /// Display name.
    pub description: String,
    /// Parent group id (null only for the root).
    pub parent: Option<String>,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
    /// When the group was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Build a new group under `parent`.
    pub fn new(id: String, description: String, parent: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            description,
            parent,
            created_at: now,
            updated_at: now,
        }
    }

    /// The fixed root group row.
    pub fn root() -> Self {
        Self::new(ROOT_GROUP_ID.to_string(), "Root".to_string(), None)
    }

    /// The fixed administrators group row.
    pub fn admins() -> Self {
        Self::new(
            ADMINS_GROUP_ID.to_string(),
            "Admins".to_string(),
            Some(ROOT_GROUP_ID.to_string()),
        )
    }

    /// The fixed everyone group row.
    pub fn everyone() -> Self {
        Self::new(
            EVERYONE_GROUP_ID.to_string(),
            "Everyone".to_string(),
            Some(ROOT_GROUP_ID.to_string()),
        )
    }

    /// Root, Admins, and Everyone are immutable and undeletable.
    pub fn is_fixed(&self) -> bool {
        is_fixed_group(&self.id)
    }
}

/// Whether `id` names one of the fixed groups.
pub fn is_fixed_group(id: &str) -> bool {
    matches!(id, ROOT_GROUP_ID | ADMINS_GROUP_ID | EVERYONE_GROUP_ID)
}

impl TreeRow for Group {
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

/// A node in the group catalogue tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    /// Group ID.
    pub id: String,
    /// Group name.
    pub description: String,
    /// Parent group ID.
    pub parent: Option<String>,
    /// Child groups, sorted by description.
    pub children: Vec<GroupNode>,
}
