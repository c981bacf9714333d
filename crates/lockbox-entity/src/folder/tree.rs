//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

/// A node in a visible-folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: String,
    /// Folder name.
    pub description: String,
    /// Parent folder ID.
    pub parent: Option<String>,
    /// Whether this is a personal folder.
    pub personal: bool,
    /// Whether the viewer can read this folder, as opposed to seeing it
    /// only because it is an ancestor of something readable.
    pub readable: bool,
    /// Child folder nodes, sorted by description.
    pub children: Vec<FolderNode>,
}

/// The folders visible to one user, nested parent-to-children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTree {
    /// Top-level node(s); normally the single root folder.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the tree.
    pub total_folders: u64,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&FolderNode> {
        let mut stack: Vec<&FolderNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}
