//! Folder hierarchy, permission resolution, and folder management.

pub mod hierarchy;
pub mod service;

pub use hierarchy::FolderHierarchy;
pub use service::{CreateFolderRequest, FolderService, UpdateFolderRequest};
