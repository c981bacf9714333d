//! API keys: secondary credentials gated by IP and time whitelists.

pub mod service;

pub use service::{ApiKeyService, CreateApiKeyRequest, CreatedApiKey};
