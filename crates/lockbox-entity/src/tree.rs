//! Shared shape of rows that form a parent-pointer tree.

/// A row with an id and an optional parent id.
///
/// Folders and groups both implement this so traversal and nesting code
/// can be written once.
pub trait TreeRow: Clone {
    /// Row identifier.
    fn id(&self) -> &str;
    /// Parent identifier, `None` only for the root.
    fn parent_id(&self) -> Option<&str>;
    /// Display label used for ordering siblings.
    fn label(&self) -> &str;
}
