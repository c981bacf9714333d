//! Key management configuration.

use serde::{Deserialize, Serialize};

/// Process-wide key management settings.
///
/// Per-provider settings (key file paths, cloud endpoints) live in the
/// stored KMS records, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmsConfig {
    /// Hex-encoded 256-bit master key file used by the legacy no-DEK mode.
    #[serde(default = "default_master_key_file")]
    pub master_key_file: String,
    /// Encrypt with the legacy master key when no KMS record is active.
    #[serde(default)]
    pub allow_legacy_fallback: bool,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            master_key_file: default_master_key_file(),
            allow_legacy_fallback: false,
        }
    }
}

fn default_master_key_file() -> String {
    "data/keys/master.key".to_string()
}
