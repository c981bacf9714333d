//! Loading key-encryption keys from disk.

use tracing::debug;
use zeroize::Zeroizing;

use lockbox_core::error::{AppError, ErrorKind};
use lockbox_core::result::AppResult;
use lockbox_crypto::SecretKey;

/// Read a hex-encoded 256-bit key from `path`.
pub async fn load_key_file(path: &str) -> AppResult<SecretKey> {
    let text = Zeroizing::new(tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Kms,
            format!("Failed to read key file '{path}'"),
            e,
        )
    })?);
    let key = SecretKey::from_hex(&text)
        .map_err(|e| AppError::kms(format!("Invalid key in '{path}': {}", e.message)))?;
    debug!(path = %path, "Loaded key file");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", "ab".repeat(32)).unwrap();
        let key = load_key_file(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(key.as_bytes(), &[0xab; 32]);
    }

    #[tokio::test]
    async fn test_bad_key_file() {
        let err = load_key_file("/nonexistent/lockbox.key").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Kms);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not-hex").unwrap();
        assert!(load_key_file(file.path().to_str().unwrap()).await.is_err());
    }
}
