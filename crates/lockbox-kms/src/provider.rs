//! The three envelope-encryption providers.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, info};
use zeroize::Zeroizing;

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_crypto::cipher::{self, SealedBox};
use lockbox_crypto::SecretKey;
use lockbox_entity::kms::{Algorithm, Envelope, KmsRecord, KmsType};

use crate::client::{KeyWrapClient, KeyWrapClientFactory};
use crate::config::{self, CloudKmsConfig, LocalFileConfig};
use crate::master_key::load_key_file;

/// A ready-to-use KMS, built from a stored record.
#[derive(Debug)]
pub enum KmsProvider {
    /// Encrypts directly with the process master key.
    NoDek(NoDekProvider),
    /// Fresh DEK per value, wrapped by a key read from a local file.
    LocalFile(LocalFileProvider),
    /// Fresh DEK per value, wrapped by an external key service.
    Cloud(CloudProvider),
}

/// Direct encryption with the master key; envelopes carry no DEK.
#[derive(Debug)]
pub struct NoDekProvider {
    kms_id: Option<String>,
    description: String,
    key: SecretKey,
}

/// DEKs wrapped locally as `iv:ciphertext:tag`.
#[derive(Debug)]
pub struct LocalFileProvider {
    kms_id: String,
    description: String,
    kek: SecretKey,
}

/// DEKs wrapped by a [`KeyWrapClient`].
#[derive(Debug)]
pub struct CloudProvider {
    kms_id: String,
    description: String,
    client: Arc<dyn KeyWrapClient>,
}

impl KmsProvider {
    /// Build and initialize the provider for a record. Key files are read
    /// and clients constructed here, once.
    pub async fn from_record(
        record: &KmsRecord,
        master_key_file: &str,
        clients: &dyn KeyWrapClientFactory,
    ) -> AppResult<Self> {
        let provider = match record.kms_type {
            KmsType::NoDek => Self::NoDek(NoDekProvider {
                kms_id: Some(record.id.clone()),
                description: record.description.clone(),
                key: load_key_file(master_key_file).await?,
            }),
            KmsType::LocalFile => {
                let cfg: LocalFileConfig = config::parse(record)?;
                Self::LocalFile(LocalFileProvider {
                    kms_id: record.id.clone(),
                    description: record.description.clone(),
                    kek: load_key_file(&cfg.path).await?,
                })
            }
            KmsType::Cloud => {
                let cfg: CloudKmsConfig = config::parse(record)?;
                Self::Cloud(CloudProvider {
                    kms_id: record.id.clone(),
                    description: record.description.clone(),
                    client: clients.build(&cfg)?,
                })
            }
        };

        info!(kms_id = %record.id, kms_type = %record.kms_type, "Initialized KMS provider");
        Ok(provider)
    }

    /// The legacy provider used for envelopes with no KMS id.
    pub fn legacy(key: SecretKey) -> Self {
        Self::NoDek(NoDekProvider {
            kms_id: None,
            description: "legacy".to_string(),
            key,
        })
    }

    /// Human-readable provider name, used as the metrics label.
    pub fn describe(&self) -> &str {
        match self {
            Self::NoDek(p) => &p.description,
            Self::LocalFile(p) => &p.description,
            Self::Cloud(p) => &p.description,
        }
    }

    /// Id stamped on envelopes this provider produces.
    pub fn kms_id(&self) -> Option<&str> {
        match self {
            Self::NoDek(p) => p.kms_id.as_deref(),
            Self::LocalFile(p) => Some(&p.kms_id),
            Self::Cloud(p) => Some(&p.kms_id),
        }
    }

    /// Encrypt `plaintext` into a self-describing envelope.
    pub async fn encrypt(&self, plaintext: &[u8], algorithm: Algorithm) -> AppResult<Envelope> {
        match self {
            Self::NoDek(p) => seal_envelope(&p.key, plaintext, algorithm, p.kms_id.clone(), None, None),
            Self::LocalFile(p) => {
                let dek = SecretKey::generate();
                let wrapped = cipher::seal(&p.kek, dek.as_bytes())?.to_compact();
                seal_envelope(
                    &dek,
                    plaintext,
                    algorithm,
                    Some(p.kms_id.clone()),
                    Some(wrapped),
                    None,
                )
            }
            Self::Cloud(p) => {
                let dek = SecretKey::generate();
                let wrapped = p.client.wrap(dek.as_bytes()).await?;
                debug!(kms_id = %p.kms_id, key_version = ?wrapped.key_version, "Wrapped data key");
                seal_envelope(
                    &dek,
                    plaintext,
                    algorithm,
                    Some(p.kms_id.clone()),
                    Some(STANDARD.encode(&wrapped.ciphertext)),
                    wrapped.key_version,
                )
            }
        }
    }

    /// Decrypt an envelope. Fails closed on any tampering.
    pub async fn decrypt(&self, envelope: &Envelope) -> AppResult<Zeroizing<Vec<u8>>> {
        match self {
            Self::NoDek(p) => open_envelope(&p.key, envelope),
            Self::LocalFile(p) => {
                let wrapped = SealedBox::from_compact(required_dek(envelope)?)?;
                let dek = SecretKey::from_slice(&cipher::open(&p.kek, &wrapped)?)?;
                open_envelope(&dek, envelope)
            }
            Self::Cloud(p) => {
                let wrapped = STANDARD
                    .decode(required_dek(envelope)?)
                    .map_err(|e| AppError::kms(format!("Wrapped key is not base64: {e}")))?;
                let dek = SecretKey::from_slice(&p.client.unwrap(&wrapped).await?)?;
                open_envelope(&dek, envelope)
            }
        }
    }
}

fn required_dek(envelope: &Envelope) -> AppResult<&str> {
    envelope
        .dek
        .as_deref()
        .ok_or_else(|| AppError::kms("Envelope is missing its wrapped data key"))
}

fn seal_envelope(
    key: &SecretKey,
    plaintext: &[u8],
    algorithm: Algorithm,
    kms_id: Option<String>,
    dek: Option<String>,
    kek_version: Option<String>,
) -> AppResult<Envelope> {
    let sealed = match algorithm {
        Algorithm::Aes256Gcm => cipher::seal(key, plaintext)?,
    };
    Ok(Envelope {
        kms_id,
        dek,
        kek_version,
        algorithm,
        iv: sealed.iv_hex(),
        auth_tag: sealed.auth_tag_hex(),
        ciphertext: sealed.ciphertext_hex(),
    })
}

fn open_envelope(key: &SecretKey, envelope: &Envelope) -> AppResult<Zeroizing<Vec<u8>>> {
    let sealed = SealedBox::from_hex(&envelope.iv, &envelope.ciphertext, &envelope.auth_tag)?;
    match envelope.algorithm {
        Algorithm::Aes256Gcm => cipher::open(key, &sealed),
    }
}
