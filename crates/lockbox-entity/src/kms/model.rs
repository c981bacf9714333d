//! KMS record entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use lockbox_core::AppError;

/// Pseudo KMS id stamped on envelopes produced by the legacy master key.
pub const LEGACY_KMS_ID: &str = "none";

/// Discriminant selecting the provider implementation for a KMS record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "kms_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KmsType {
    /// Direct encryption with the process master key; no DEK.
    NoDek,
    /// Per-item DEK wrapped with a master key read from a local file.
    LocalFile,
    /// Per-item DEK wrapped by an external key-management service.
    Cloud,
}

impl KmsType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDek => "no_dek",
            Self::LocalFile => "local_file",
            Self::Cloud => "cloud",
        }
    }
}

impl fmt::Display for KmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KmsType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_dek" | "nodek" => Ok(Self::NoDek),
            "local_file" | "local" => Ok(Self::LocalFile),
            "cloud" => Ok(Self::Cloud),
            _ => Err(AppError::validation(format!("Invalid KMS type: '{s}'"))),
        }
    }
}

/// A configured key-management provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct KmsRecord {
    /// Unique KMS identifier, referenced by every envelope it produced.
    pub id: String,
    /// Provider implementation.
    pub kms_type: KmsType,
    /// Display name.
    pub description: String,
    /// Provider settings as a JSON document.
    pub config: String,
    /// At most one record is active; it encrypts all new data.
    pub active: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kms_type() {
        assert_eq!("local_file".parse::<KmsType>().unwrap(), KmsType::LocalFile);
        assert_eq!("Cloud".parse::<KmsType>().unwrap(), KmsType::Cloud);
        assert!("hsm".parse::<KmsType>().is_err());
    }
}
