//! User lifecycle.

pub mod service;

pub use service::{CreateUserRequest, UserService};
