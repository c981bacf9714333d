//! Item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::kms::Envelope;

/// An encrypted secret stored in exactly one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    /// Unique item identifier.
    pub id: String,
    /// Owning folder.
    pub folder_id: String,
    /// Plain title, used for listing.
    pub title: String,
    /// Encrypted description.
    #[sqlx(json)]
    pub description: Envelope,
    /// Encrypted payload.
    #[sqlx(json)]
    pub data: Envelope,
    /// KMS that encrypted both envelopes, `None` for legacy data.
    pub kms_id: Option<String>,
    /// Free-form, unencrypted metadata.
    pub metadata: String,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}
