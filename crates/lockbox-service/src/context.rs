//! Request context carrying the authenticated caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lockbox_auth::Identity;
use lockbox_core::error::AppError;

/// Context for the current authenticated request.
///
/// Built from the identity the auth layer hands over and passed into every
/// service method so each operation knows who is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: String,
    /// Whether the user is an administrator.
    pub admin: bool,
    /// Whether personal folders are unlocked for this session.
    pub personal_unlocked: bool,
    /// IP address of the request origin, when known.
    pub ip_address: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: impl Into<String>, admin: bool, personal_unlocked: bool) -> Self {
        Self {
            user_id: user_id.into(),
            admin,
            personal_unlocked,
            ip_address: None,
            request_time: Utc::now(),
        }
    }

    /// Context for an authenticated identity.
    pub fn from_identity(identity: &Identity) -> Self {
        Self::new(
            identity.user_id.clone(),
            identity.is_admin,
            identity.personal_unlocked,
        )
    }

    /// Administrative context used by operator tooling.
    pub fn system() -> Self {
        Self::new("system", true, false)
    }

    /// Attach the origin address.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Returns whether the current user is an admin.
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Administrator privileges required"))
        }
    }
}
