//! API key entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::kms::Envelope;

/// A secondary credential bound to one user, gated by IP and time whitelists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    /// Unique key identifier, presented alongside the secret.
    pub id: String,
    /// Display name.
    pub description: String,
    /// Owning user.
    pub user_id: String,
    /// Argon2id hash of the secret, used for verification.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Envelope-encrypted copy of the secret.
    #[sqlx(json)]
    #[serde(skip_serializing)]
    pub secret: Envelope,
    /// KMS that encrypted `secret`.
    pub kms_id: Option<String>,
    /// Last day the key is usable.
    pub expires_at: NaiveDate,
    /// Whether the key is enabled.
    pub active: bool,
    /// Comma-separated IPs/CIDR blocks; empty means unrestricted.
    pub ip_whitelist: String,
    /// Comma-separated `DOW:HHMM-HHMM` ranges; empty means unrestricted.
    pub time_whitelist: String,
    /// Last successful use.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the key was created.
    pub created_at: DateTime<Utc>,
    /// When the key was last updated.
    pub updated_at: DateTime<Utc>,
}
