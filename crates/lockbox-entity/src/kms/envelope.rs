//! Self-describing encrypted value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use lockbox_core::AppError;

/// Payload cipher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256 in Galois/Counter Mode, 96-bit IV, 128-bit tag.
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl Algorithm {
    /// Return the algorithm identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            _ => Err(AppError::validation(format!("Unsupported algorithm: '{s}'"))),
        }
    }
}

/// Everything needed to decrypt a value, regardless of which KMS is
/// active when it is read back.
///
/// Binary fields are hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// KMS record that produced this envelope; `None` for legacy data.
    pub kms_id: Option<String>,
    /// Wrapped data encryption key; `None` in no-DEK mode.
    pub dek: Option<String>,
    /// Version of the key-encryption key that wrapped `dek`.
    pub kek_version: Option<String>,
    /// Payload cipher.
    pub algorithm: Algorithm,
    /// Initialization vector.
    pub iv: String,
    /// Authentication tag.
    pub auth_tag: String,
    /// Encrypted payload.
    pub ciphertext: String,
}
