//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A Lockbox account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Login name.
    pub login: String,
    /// Contact email.
    pub email: String,
    /// Argon2id hash of the password.
    #[serde(skip_serializing)]
    pub secret: String,
    /// Whether the account may sign in.
    pub active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
