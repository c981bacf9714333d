//! Cloud KMS REST client (`:encrypt` / `:decrypt`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use zeroize::Zeroizing;

use lockbox_core::error::{AppError, ErrorKind};
use lockbox_core::result::AppResult;

use super::{KeyWrapClient, KeyWrapClientFactory, WrappedKey};
use crate::config::CloudKmsConfig;

/// Talks to a cloud key service over HTTPS with a bearer token.
pub struct HttpKeyWrapClient {
    client: reqwest::Client,
    endpoint: String,
    key_name: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for HttpKeyWrapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpKeyWrapClient")
            .field("endpoint", &self.endpoint)
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct EncryptResponse {
    ciphertext: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

impl HttpKeyWrapClient {
    /// Build a client from a KMS record's settings. The token comes from
    /// `config.token` or, failing that, the `config.token_env` variable.
    pub fn new(config: &CloudKmsConfig) -> AppResult<Self> {
        let token = match &config.token {
            Some(token) => token.clone(),
            None => std::env::var(&config.token_env).map_err(|_| {
                AppError::kms(format!(
                    "Set {} with a bearer token for the key service",
                    config.token_env
                ))
            })?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Kms, "Failed to build key service client", e)
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            key_name: config.key_name.clone(),
            token: Zeroizing::new(token),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> AppResult<T> {
        let url = format!("{}/{}:{action}", self.endpoint, self.key_name);
        debug!(url = %url, "Key service request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Key service {action} request failed"),
                    e,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(format!(
                "Key service {action} failed: {status} {text}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Malformed key service {action} response"),
                e,
            )
        })
    }
}

#[async_trait]
impl KeyWrapClient for HttpKeyWrapClient {
    async fn wrap(&self, dek: &[u8]) -> AppResult<WrappedKey> {
        let response: EncryptResponse = self
            .call("encrypt", json!({ "plaintext": STANDARD.encode(dek) }))
            .await?;
        let ciphertext = STANDARD
            .decode(&response.ciphertext)
            .map_err(|e| AppError::kms(format!("Wrapped key is not base64: {e}")))?;
        Ok(WrappedKey {
            ciphertext,
            key_version: response.name,
        })
    }

    async fn unwrap(&self, wrapped: &[u8]) -> AppResult<Zeroizing<Vec<u8>>> {
        let response: DecryptResponse = self
            .call("decrypt", json!({ "ciphertext": STANDARD.encode(wrapped) }))
            .await?;
        let plaintext = Zeroizing::new(response.plaintext);
        STANDARD
            .decode(plaintext.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| AppError::kms(format!("Unwrapped key is not base64: {e}")))
    }
}

/// Builds [`HttpKeyWrapClient`]s.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory;

impl KeyWrapClientFactory for HttpClientFactory {
    fn build(&self, config: &CloudKmsConfig) -> AppResult<Arc<dyn KeyWrapClient>> {
        Ok(Arc::new(HttpKeyWrapClient::new(config)?))
    }
}
