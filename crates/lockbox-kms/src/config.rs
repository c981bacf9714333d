//! Provider settings stored as JSON in `KmsRecord.config`.

use serde::{Deserialize, Serialize};

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_entity::kms::{KmsRecord, KmsType};

/// Settings for a local-file KMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileConfig {
    /// File holding the hex-encoded 256-bit key-encryption key.
    pub path: String,
}

/// Settings for a cloud KMS reached over its REST interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudKmsConfig {
    /// Base URL of the key service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Full resource name of the key, e.g.
    /// `projects/p/locations/l/keyRings/r/cryptoKeys/k`.
    pub key_name: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Bearer token given inline; takes precedence over `token_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "https://cloudkms.googleapis.com/v1".to_string()
}

fn default_token_env() -> String {
    "LOCKBOX_KMS_TOKEN".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Parse the config of a record of the expected type.
pub(crate) fn parse<T: serde::de::DeserializeOwned>(record: &KmsRecord) -> AppResult<T> {
    serde_json::from_str(&record.config).map_err(|e| {
        AppError::kms(format!(
            "Invalid {} configuration for KMS '{}': {e}",
            record.kms_type, record.id
        ))
    })
}

/// Check that `config` is well-formed for `kms_type`, without touching key
/// material.
pub fn validate(kms_type: KmsType, config: &str) -> AppResult<()> {
    let result = match kms_type {
        KmsType::NoDek => serde_json::from_str::<serde_json::Value>(config)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        KmsType::LocalFile => serde_json::from_str::<LocalFileConfig>(config)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        KmsType::Cloud => serde_json::from_str::<CloudKmsConfig>(config)
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };
    result.map_err(|e| AppError::unprocessable(format!("Invalid {kms_type} configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_defaults() {
        let cfg: CloudKmsConfig =
            serde_json::from_str(r#"{"key_name":"projects/p/locations/l/keyRings/r/cryptoKeys/k"}"#)
                .unwrap();
        assert_eq!(cfg.endpoint, "https://cloudkms.googleapis.com/v1");
        assert_eq!(cfg.token_env, "LOCKBOX_KMS_TOKEN");
        assert_eq!(cfg.timeout_seconds, 10);
        assert!(cfg.token.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(validate(KmsType::NoDek, "{}").is_ok());
        assert!(validate(KmsType::LocalFile, r#"{"path":"/etc/lockbox/kek.hex"}"#).is_ok());
        assert!(validate(KmsType::LocalFile, "{}").is_err());
        assert!(validate(KmsType::Cloud, "not json").is_err());
    }
}
