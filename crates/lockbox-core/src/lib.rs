//! # lockbox-core
//!
//! Core crate for Lockbox. Contains the unified error system, configuration
//! schemas, identifier generation, and the collaborator traits (cache,
//! audit, metrics) implemented by other crates.
//!
//! This crate has **no** internal dependencies on other Lockbox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
