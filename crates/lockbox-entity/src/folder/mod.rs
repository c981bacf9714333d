//! Folder domain entities.

pub mod model;
pub mod tree;

pub use model::{Folder, PERSONAL_ROOT_ID, ROOT_FOLDER_ID};
pub use tree::{FolderNode, FolderTree};
