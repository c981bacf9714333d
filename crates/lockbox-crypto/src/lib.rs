//! # lockbox-crypto
//!
//! Cryptographic primitives for Lockbox:
//!
//! - `cipher`: AES-256-GCM sealing and opening with detached IV and tag
//! - `password`: Argon2id password hashing and verification
//! - `random`: random keys, bytes, and alphanumeric strings

pub mod cipher;
pub mod password;
pub mod random;

pub use cipher::{IV_SIZE, KEY_SIZE, SealedBox, SecretKey, TAG_SIZE};
pub use password::PasswordHasher;
