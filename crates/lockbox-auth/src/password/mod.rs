//! Password hashing and policy enforcement.

pub mod validator;

pub use lockbox_crypto::PasswordHasher;
pub use validator::PasswordValidator;
