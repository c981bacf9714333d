//! AES-256-GCM authenticated encryption.
//!
//! The tag is kept detached from the ciphertext so it can be stored in its
//! own column, and a sealed value can also be rendered as the compact
//! `iv:ciphertext:tag` hex string used for wrapped data keys.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use lockbox_core::{AppError, AppResult};

use crate::random;

/// Size of the encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM IV in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        random::fill(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            AppError::crypto(format!(
                "Invalid key length: expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse a hex-encoded key, ignoring surrounding whitespace.
    pub fn from_hex(text: &str) -> AppResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(text.trim())
                .map_err(|e| AppError::crypto(format!("Invalid hex key: {e}")))?,
        );
        Self::from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Output of one AES-256-GCM encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// Random IV used for this encryption.
    pub iv: Vec<u8>,
    /// Ciphertext without the tag.
    pub ciphertext: Vec<u8>,
    /// Detached authentication tag.
    pub auth_tag: Vec<u8>,
}

impl SealedBox {
    /// Rebuild from hex-encoded parts.
    pub fn from_hex(iv: &str, ciphertext: &str, auth_tag: &str) -> AppResult<Self> {
        let decode = |field: &str, value: &str| {
            hex::decode(value).map_err(|e| AppError::crypto(format!("Invalid hex in {field}: {e}")))
        };
        Ok(Self {
            iv: decode("iv", iv)?,
            ciphertext: decode("ciphertext", ciphertext)?,
            auth_tag: decode("auth tag", auth_tag)?,
        })
    }

    /// Hex-encoded IV.
    pub fn iv_hex(&self) -> String {
        hex::encode(&self.iv)
    }

    /// Hex-encoded ciphertext.
    pub fn ciphertext_hex(&self) -> String {
        hex::encode(&self.ciphertext)
    }

    /// Hex-encoded authentication tag.
    pub fn auth_tag_hex(&self) -> String {
        hex::encode(&self.auth_tag)
    }

    /// Render as `iv:ciphertext:tag`.
    pub fn to_compact(&self) -> String {
        format!(
            "{}:{}:{}",
            self.iv_hex(),
            self.ciphertext_hex(),
            self.auth_tag_hex()
        )
    }

    /// Parse the `iv:ciphertext:tag` form.
    pub fn from_compact(text: &str) -> AppResult<Self> {
        let mut parts = text.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(iv), Some(ct), Some(tag), None) => Self::from_hex(iv, ct, tag),
            _ => Err(AppError::crypto("Malformed sealed value, expected iv:ciphertext:tag")),
        }
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn seal(key: &SecretKey, plaintext: &[u8]) -> AppResult<SealedBox> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| AppError::crypto("Invalid AES-256 key"))?;

    let iv = random::bytes(IV_SIZE);
    let mut combined = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| AppError::crypto("Encryption failed"))?;

    let auth_tag = combined.split_off(combined.len() - TAG_SIZE);
    Ok(SealedBox {
        iv,
        ciphertext: combined,
        auth_tag,
    })
}

/// Decrypt and authenticate a sealed value.
///
/// Any tampering with the IV, ciphertext, or tag yields an error; partial
/// plaintext is never returned.
pub fn open(key: &SecretKey, sealed: &SealedBox) -> AppResult<Zeroizing<Vec<u8>>> {
    if sealed.iv.len() != IV_SIZE {
        return Err(AppError::crypto(format!(
            "Invalid IV length: expected {IV_SIZE} bytes, got {}",
            sealed.iv.len()
        )));
    }
    if sealed.auth_tag.len() != TAG_SIZE {
        return Err(AppError::crypto(format!(
            "Invalid auth tag length: expected {TAG_SIZE} bytes, got {}",
            sealed.auth_tag.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| AppError::crypto("Invalid AES-256 key"))?;

    let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&sealed.ciphertext);
    combined.extend_from_slice(&sealed.auth_tag);

    cipher
        .decrypt(Nonce::from_slice(&sealed.iv), combined.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| AppError::crypto("Decryption failed: authentication tag mismatch"))
}
