//! Folder-group permission rows and the resolved permission value.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One grant of read/write on a folder to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FolderGroupPermission {
    /// Folder the grant applies to (and, by inheritance, its subtree).
    pub folder_id: String,
    /// Group receiving the grant.
    pub group_id: String,
    /// Read access.
    pub read: bool,
    /// Write access. Never stored true without `read`.
    pub write: bool,
}

impl FolderGroupPermission {
    /// The resolved value of this single row.
    pub fn permissions(&self) -> Permissions {
        Permissions {
            read: self.read,
            write: self.write,
        }
    }
}

/// Effective read/write permissions of a user on a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    /// Read access.
    pub read: bool,
    /// Write access.
    pub write: bool,
}

impl Permissions {
    /// No access.
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };

    /// Read and write.
    pub const FULL: Self = Self {
        read: true,
        write: true,
    };

    /// OR-combine with another grant. Permissions only ever grow.
    pub fn merge(self, other: Permissions) -> Self {
        Self {
            read: self.read || other.read,
            write: self.write || other.write,
        }
    }

    /// Both bits set; no further grant can add anything.
    pub fn is_full(&self) -> bool {
        self.read && self.write
    }
}
