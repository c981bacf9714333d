//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum length of a new user password.
    #[serde(default = "default_password_min_length")]
    pub password_min_length: u32,
    /// Length of generated API key secrets.
    #[serde(default = "default_api_key_length")]
    pub api_key_length: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_min_length: default_password_min_length(),
            api_key_length: default_api_key_length(),
        }
    }
}

fn default_password_min_length() -> u32 {
    8
}

fn default_api_key_length() -> u32 {
    40
}
