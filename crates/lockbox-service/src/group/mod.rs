//! Group hierarchy and group management.

pub mod hierarchy;
pub mod service;

pub use hierarchy::GroupHierarchy;
pub use service::{CreateGroupRequest, GroupService, UpdateGroupRequest};
