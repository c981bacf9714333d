//! Caller identity.

pub mod claims;

pub use claims::{Claims, Identity};
