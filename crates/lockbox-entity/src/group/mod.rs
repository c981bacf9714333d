//! Group domain entities.

pub mod model;

pub use model::{ADMINS_GROUP_ID, EVERYONE_GROUP_ID, Group, GroupNode, ROOT_GROUP_ID};
