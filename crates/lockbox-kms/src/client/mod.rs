//! Clients for external key-wrapping services.

mod http;
mod local;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use zeroize::Zeroizing;

use lockbox_core::result::AppResult;

use crate::config::CloudKmsConfig;

pub use http::{HttpClientFactory, HttpKeyWrapClient};
pub use local::{StaticClientFactory, StaticKeyWrapClient};

/// A data key wrapped by an external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Opaque wrapped key bytes.
    pub ciphertext: Vec<u8>,
    /// Key version that performed the wrap, when the service reports one.
    pub key_version: Option<String>,
}

/// Wraps and unwraps data keys with a key that never leaves the service.
#[async_trait]
pub trait KeyWrapClient: Send + Sync + fmt::Debug {
    /// Wrap a plaintext data key.
    async fn wrap(&self, dek: &[u8]) -> AppResult<WrappedKey>;

    /// Recover a data key previously returned by [`wrap`](Self::wrap).
    async fn unwrap(&self, wrapped: &[u8]) -> AppResult<Zeroizing<Vec<u8>>>;
}

/// Builds a client for a cloud KMS record.
pub trait KeyWrapClientFactory: Send + Sync + fmt::Debug {
    /// Construct a client. Called once per KMS when its provider is built.
    fn build(&self, config: &CloudKmsConfig) -> AppResult<Arc<dyn KeyWrapClient>>;
}
