//! Group membership rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user belonging to a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    /// Group id.
    pub group_id: String,
    /// User id.
    pub user_id: String,
}
