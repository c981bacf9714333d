//! # lockbox-service
//!
//! Business logic for Lockbox. Each service orchestrates the store traits,
//! the cache, the KMS wallet, and the auth helpers to implement one family
//! of use cases.
//!
//! Services follow constructor injection: every dependency is handed over
//! at construction time as an `Arc`. [`Lockbox`] wires the whole set from a
//! single store.

pub mod apikey;
pub mod app;
pub(crate) mod cached;
pub mod context;
pub mod folder;
pub mod group;
pub mod hierarchy;
pub mod item;
pub mod kms;
pub mod permission;
pub mod user;

pub use apikey::ApiKeyService;
pub use app::{Collaborators, Lockbox};
pub use context::RequestContext;
pub use folder::{FolderHierarchy, FolderService};
pub use group::{GroupHierarchy, GroupService};
pub use hierarchy::Hierarchy;
pub use item::ItemService;
pub use kms::KmsService;
pub use permission::PermissionService;
pub use user::UserService;
