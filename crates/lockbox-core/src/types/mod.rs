//! Core type definitions used across the Lockbox workspace.

pub mod id;

pub use id::{is_valid_id, new_id};
