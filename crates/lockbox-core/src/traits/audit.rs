//! Fire-and-forget audit logging.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Entity created.
    Create,
    /// Entity read (secrets only).
    Read,
    /// Entity updated.
    Update,
    /// Entity deleted.
    Delete,
    /// Entity moved to a new parent.
    Move,
    /// Permission or membership granted.
    Grant,
    /// Permission or membership revoked.
    Revoke,
}

/// Which kind of entity was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    /// A folder.
    Folder,
    /// A group.
    Group,
    /// An item.
    Item,
    /// A KMS record.
    Kms,
    /// An API key.
    ApiKey,
    /// A user.
    User,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
        };
        f.write_str(s)
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Folder => "folder",
            Self::Group => "group",
            Self::Item => "item",
            Self::Kms => "kms",
            Self::ApiKey => "apikey",
            Self::User => "user",
        };
        f.write_str(s)
    }
}

/// Sink for audit events. Implementations must not fail the caller.
pub trait AuditSink: Send + Sync + fmt::Debug + 'static {
    /// Record that `user_id` performed `action` on an entity.
    fn log(&self, user_id: &str, action: AuditAction, entity: AuditEntity, entity_id: &str);
}

/// Audit sink that emits a structured `tracing` event per record.
#[derive(Debug, Clone, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn log(&self, user_id: &str, action: AuditAction, entity: AuditEntity, entity_id: &str) {
        info!(
            target: "lockbox::audit",
            user_id,
            action = %action,
            entity = %entity,
            entity_id,
            "audit"
        );
    }
}
