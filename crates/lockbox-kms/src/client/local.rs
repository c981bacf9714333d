//! Key-wrap client backed by a key held in process memory.
//!
//! Stands in for a cloud key service in development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use lockbox_core::result::AppResult;
use lockbox_crypto::cipher::{self, SealedBox};
use lockbox_crypto::SecretKey;

use super::{KeyWrapClient, KeyWrapClientFactory, WrappedKey};
use crate::config::CloudKmsConfig;

/// Wraps keys with AES-256-GCM under a fixed in-memory key.
#[derive(Debug, Clone)]
pub struct StaticKeyWrapClient {
    key: SecretKey,
    version: String,
}

impl StaticKeyWrapClient {
    /// Create a client wrapping under `key`, reporting `version`.
    pub fn new(key: SecretKey, version: impl Into<String>) -> Self {
        Self {
            key,
            version: version.into(),
        }
    }
}

#[async_trait]
impl KeyWrapClient for StaticKeyWrapClient {
    async fn wrap(&self, dek: &[u8]) -> AppResult<WrappedKey> {
        let sealed = cipher::seal(&self.key, dek)?;
        Ok(WrappedKey {
            ciphertext: sealed.to_compact().into_bytes(),
            key_version: Some(self.version.clone()),
        })
    }

    async fn unwrap(&self, wrapped: &[u8]) -> AppResult<Zeroizing<Vec<u8>>> {
        let text = String::from_utf8_lossy(wrapped);
        cipher::open(&self.key, &SealedBox::from_compact(&text)?)
    }
}

/// Hands out one shared [`StaticKeyWrapClient`] for every cloud KMS.
#[derive(Debug, Clone)]
pub struct StaticClientFactory {
    client: Arc<StaticKeyWrapClient>,
}

impl StaticClientFactory {
    /// Create a factory around a fresh random key.
    pub fn new() -> Self {
        Self {
            client: Arc::new(StaticKeyWrapClient::new(SecretKey::generate(), "static/1")),
        }
    }
}

impl Default for StaticClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyWrapClientFactory for StaticClientFactory {
    fn build(&self, _config: &CloudKmsConfig) -> AppResult<Arc<dyn KeyWrapClient>> {
        Ok(self.client.clone())
    }
}
