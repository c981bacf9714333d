//! # lockbox-database
//!
//! Storage for Lockbox. The service layer talks to the [`Store`] traits;
//! [`PgStore`] implements them over PostgreSQL and [`MemoryStore`] over
//! process memory.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use repositories::PgStore;
pub use store::{
    ApiKeyStore, FolderStore, GroupStore, ItemStore, KmsStore, MembershipStore, PermissionStore,
    Store, UserStore,
};
