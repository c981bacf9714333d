//! # lockbox-kms
//!
//! Envelope encryption for Lockbox.
//!
//! Every value is encrypted with AES-256-GCM. Depending on the KMS record
//! that produced it, the key is either the process master key (no-DEK
//! mode) or a fresh data key wrapped by a key-encryption key held in a
//! local file or by a cloud key service. The resulting [`Envelope`] records
//! which KMS to ask for decryption, so data stays readable after the active
//! KMS changes.
//!
//! [`Envelope`]: lockbox_entity::kms::Envelope

pub mod client;
pub mod config;
pub mod master_key;
pub mod provider;
pub mod wallet;

pub use client::{HttpClientFactory, KeyWrapClient, KeyWrapClientFactory, WrappedKey};
pub use config::{CloudKmsConfig, LocalFileConfig};
pub use provider::KmsProvider;
pub use wallet::KmsWallet;
