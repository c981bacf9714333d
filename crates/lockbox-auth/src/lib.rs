//! # lockbox-auth
//!
//! Authentication building blocks for Lockbox.
//!
//! ## Modules
//!
//! - `identity`: the verified claim set and the per-request identity derived from it
//! - `password`: Argon2id hashing and password policy enforcement
//! - `whitelist`: CIDR and time-of-day whitelists gating API keys

pub mod identity;
pub mod password;
pub mod whitelist;

pub use identity::{Claims, Identity};
pub use password::{PasswordHasher, PasswordValidator};
