//! Claim set produced by token verification.
//!
//! Issuing and verifying tokens happens outside Lockbox; the core only
//! trusts the claims it is handed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lockbox_core::error::AppError;

/// Claims embedded in a verified access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Member of the Admins group when the token was issued.
    #[serde(default)]
    pub admin: bool,
    /// Personal folders were unlocked for this session.
    #[serde(default)]
    pub personal: bool,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks whether this token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Who is making a request, as far as the core is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Authenticated user id.
    pub user_id: String,
    /// Whether the user is an administrator.
    pub is_admin: bool,
    /// Whether personal folders may be accessed in this session.
    pub personal_unlocked: bool,
}

impl Identity {
    /// Build an identity directly.
    pub fn new(user_id: impl Into<String>, is_admin: bool, personal_unlocked: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin,
            personal_unlocked,
        }
    }

    /// Derive the identity from verified claims, rejecting expired ones.
    pub fn from_claims(claims: &Claims, now: DateTime<Utc>) -> Result<Self, AppError> {
        if claims.sub.is_empty() {
            return Err(AppError::authentication("Token has no subject"));
        }
        if claims.is_expired_at(now) {
            return Err(AppError::authentication("Token has expired"));
        }
        Ok(Self::new(claims.sub.clone(), claims.admin, claims.personal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::error::ErrorKind;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "u1".into(),
            admin: true,
            personal: false,
            iat: 0,
            exp,
        }
    }

    #[test]
    fn test_from_claims() {
        let now = Utc::now();
        let id = Identity::from_claims(&claims(now.timestamp() + 60), now).unwrap();
        assert_eq!(id, Identity::new("u1", true, false));
    }

    #[test]
    fn test_expired_claims_rejected() {
        let now = Utc::now();
        let err = Identity::from_claims(&claims(now.timestamp()), now).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_flags_default_to_false() {
        let c: Claims = serde_json::from_str(r#"{"sub":"u2","iat":0,"exp":1}"#).unwrap();
        assert!(!c.admin && !c.personal);
    }
}
