//! # lockbox-entity
//!
//! Domain entity models for Lockbox. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`.

pub mod apikey;
pub mod folder;
pub mod group;
pub mod item;
pub mod kms;
pub mod membership;
pub mod permission;
pub mod tree;
pub mod user;

pub use tree::TreeRow;
