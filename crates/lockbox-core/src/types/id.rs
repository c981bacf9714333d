//! Opaque string identifiers.
//!
//! Entities are keyed by short opaque strings. Fixed well-known rows use
//! single-character ids (`"0"`, `"P"`, `"A"`, `"E"`); generated ids are
//! time-ordered UUIDv7 values rendered without hyphens, so they sort by
//! creation time like ULIDs.

use uuid::Uuid;

/// Maximum accepted identifier length.
pub const MAX_ID_LEN: usize = 64;

/// Generate a new time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Check that an identifier is non-empty, bounded, and URL-safe.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
