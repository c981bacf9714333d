//! # lockbox-cache
//!
//! Cache providers for Lockbox:
//!
//! - **memory**: in-process cache using [moka](https://crates.io/crates/moka)
//! - **redis**: shared cache using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at startup from configuration. Entries never
//! expire on their own; writers invalidate them by key prefix.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
