//! Cache key builders.
//!
//! Keys are dot-separated `<namespace>.<kind>.<user>[.<id>]` so that a
//! whole namespace, or one user's slice of it, can be dropped with a single
//! prefix delete.

/// Namespace for folder trees, readable sets, and permissions.
pub const FOLDERS: &str = "folders";

/// Namespace for the group catalogue and memberships.
pub const GROUPS: &str = "groups";

// ── Folder keys ────────────────────────────────────────────

/// Nested folder tree visible to a user.
pub fn folder_tree(user_id: &str) -> String {
    format!("{FOLDERS}.tree.{user_id}")
}

/// Flat list of folder ids a user can read.
pub fn folder_readable(user_id: &str) -> String {
    format!("{FOLDERS}.readable.{user_id}")
}

/// Effective permissions of a user on one folder.
pub fn folder_permission(user_id: &str, folder_id: &str) -> String {
    format!("{FOLDERS}.perm.{user_id}.{folder_id}")
}

/// Prefix covering every cached permission of one user.
pub fn folder_permission_prefix(user_id: &str) -> String {
    format!("{FOLDERS}.perm.{user_id}.")
}

// ── Group keys ─────────────────────────────────────────────

/// The full group catalogue tree.
pub fn group_tree() -> String {
    format!("{GROUPS}.tree")
}

/// Group ids a user belongs to.
pub fn user_groups(user_id: &str) -> String {
    format!("{GROUPS}.member.{user_id}")
}

/// Prefix covering a whole namespace.
pub fn namespace(name: &str) -> String {
    format!("{name}.")
}
