//! Folder permission entities.

pub mod model;

pub use model::{FolderGroupPermission, Permissions};
