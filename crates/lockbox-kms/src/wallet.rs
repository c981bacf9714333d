//! Process-wide cache of initialized KMS providers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};
use zeroize::Zeroizing;

use lockbox_core::config::KmsConfig;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::MetricsSink;
use lockbox_database::KmsStore;
use lockbox_entity::kms::{Algorithm, Envelope, KmsRecord, LEGACY_KMS_ID};

use crate::client::KeyWrapClientFactory;
use crate::master_key::load_key_file;
use crate::provider::KmsProvider;

/// Counter incremented on every encryption.
pub const ENCRYPT_COUNTER: &str = "kms.encrypt";

/// Counter incremented on every decryption.
pub const DECRYPT_COUNTER: &str = "kms.decrypt";

const PROBE: &[u8] = b"lockbox-kms-probe";

/// Resolves KMS ids to initialized providers and runs envelope
/// encryption through them.
///
/// Providers are built lazily on first use and kept until
/// [`reset_wallet`](Self::reset_wallet). Two callers racing to build the
/// same provider may both build it; the first insert wins.
pub struct KmsWallet {
    store: Arc<dyn KmsStore>,
    config: KmsConfig,
    clients: Arc<dyn KeyWrapClientFactory>,
    metrics: Arc<dyn MetricsSink>,
    wallet: DashMap<String, Arc<KmsProvider>>,
    active: RwLock<Option<String>>,
    /// Bumped by every reset; a lookup started before a reset must not
    /// fill the memo after it.
    generation: AtomicU64,
    legacy: OnceCell<Arc<KmsProvider>>,
}

impl fmt::Debug for KmsWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsWallet")
            .field("providers", &self.wallet.len())
            .field("master_key_file", &self.config.master_key_file)
            .finish_non_exhaustive()
    }
}

impl KmsWallet {
    /// Create an empty wallet.
    pub fn new(
        store: Arc<dyn KmsStore>,
        config: KmsConfig,
        clients: Arc<dyn KeyWrapClientFactory>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            config,
            clients,
            metrics,
            wallet: DashMap::new(),
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
            legacy: OnceCell::new(),
        }
    }

    /// Encrypt with the active KMS.
    ///
    /// Fails with a KMS error when no record is active, unless legacy
    /// fallback is enabled.
    pub async fn encrypt(&self, plaintext: &[u8]) -> AppResult<Envelope> {
        let provider = self.active_provider().await?;
        self.seal(&provider, plaintext).await
    }

    /// Encrypt with a specific KMS.
    pub async fn encrypt_with(&self, kms_id: &str, plaintext: &[u8]) -> AppResult<Envelope> {
        let provider = self.provider(kms_id).await?;
        self.seal(&provider, plaintext).await
    }

    /// Encrypt a UTF-8 string with the active KMS.
    pub async fn encrypt_str(&self, plaintext: &str) -> AppResult<Envelope> {
        self.encrypt(plaintext.as_bytes()).await
    }

    /// The provider new values should be encrypted with. Resolve it once
    /// and pass it to [`seal`](Self::seal) when several fields of one
    /// record must share a KMS.
    pub async fn active_provider(&self) -> AppResult<Arc<KmsProvider>> {
        match self.active_kms_id().await? {
            Some(id) => self.provider(&id).await,
            None if self.config.allow_legacy_fallback => {
                debug!("No active KMS, using legacy master key");
                self.legacy().await
            }
            None => Err(AppError::kms("No active KMS")),
        }
    }

    /// Encrypt with an already resolved provider.
    pub async fn seal(&self, provider: &KmsProvider, plaintext: &[u8]) -> AppResult<Envelope> {
        self.metrics.incr(ENCRYPT_COUNTER, None);
        self.metrics.incr(ENCRYPT_COUNTER, Some(provider.describe()));
        provider.encrypt(plaintext, Algorithm::default()).await
    }

    /// Decrypt an envelope with the KMS that produced it, whether or not
    /// that KMS is still active.
    pub async fn decrypt(&self, envelope: &Envelope) -> AppResult<Zeroizing<Vec<u8>>> {
        let provider = match envelope.kms_id.as_deref() {
            None | Some(LEGACY_KMS_ID) => self.legacy().await?,
            Some(id) => self.provider(id).await?,
        };

        self.metrics.incr(DECRYPT_COUNTER, None);
        self.metrics.incr(DECRYPT_COUNTER, Some(provider.describe()));
        provider.decrypt(envelope).await
    }

    /// Decrypt an envelope holding UTF-8 text.
    pub async fn decrypt_string(&self, envelope: &Envelope) -> AppResult<String> {
        let bytes = self.decrypt(envelope).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::crypto("Decrypted value is not valid UTF-8"))
    }

    /// Id of the active KMS, memoized until the next reset. Absence is not
    /// memoized.
    pub async fn active_kms_id(&self) -> AppResult<Option<String>> {
        if let Some(id) = self.active.read().await.as_ref() {
            return Ok(Some(id.clone()));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let active = self.store.find_active_kms().await?.map(|r| r.id);
        if let Some(id) = &active {
            let mut memo = self.active.write().await;
            if self.generation.load(Ordering::Acquire) == generation {
                debug!(kms_id = %id, "Resolved active KMS");
                *memo = Some(id.clone());
            } else {
                debug!(kms_id = %id, "Wallet reset during lookup, not memoizing");
            }
        }
        Ok(active)
    }

    /// The initialized provider for `kms_id`.
    pub async fn provider(&self, kms_id: &str) -> AppResult<Arc<KmsProvider>> {
        if let Some(provider) = self.wallet.get(kms_id) {
            return Ok(provider.clone());
        }

        let generation = self.generation.load(Ordering::Acquire);
        let record = self
            .store
            .find_kms(kms_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("KMS '{kms_id}' not found")))?;
        let provider = Arc::new(
            KmsProvider::from_record(&record, &self.config.master_key_file, self.clients.as_ref())
                .await?,
        );

        // Holding the memo lock keeps a reset from landing between the
        // generation check and the insert.
        let _guard = self.active.read().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(provider);
        }
        Ok(self
            .wallet
            .entry(kms_id.to_string())
            .or_insert(provider)
            .clone())
    }

    /// Build the provider for a record that is not stored yet and run one
    /// encrypt/decrypt cycle through it. Nothing is cached or counted.
    pub async fn probe(&self, record: &KmsRecord) -> AppResult<()> {
        let provider =
            KmsProvider::from_record(record, &self.config.master_key_file, self.clients.as_ref())
                .await?;
        let envelope = provider.encrypt(PROBE, Algorithm::default()).await?;
        if provider.decrypt(&envelope).await?.as_slice() != PROBE {
            return Err(AppError::kms(format!(
                "KMS '{}' did not round-trip the probe value",
                record.id
            )));
        }
        debug!(kms_id = %record.id, "KMS probe succeeded");
        Ok(())
    }

    /// Provider for envelopes written before any KMS was configured.
    pub async fn legacy(&self) -> AppResult<Arc<KmsProvider>> {
        self.legacy
            .get_or_try_init(|| async {
                let key = load_key_file(&self.config.master_key_file).await?;
                Ok::<_, AppError>(Arc::new(KmsProvider::legacy(key)))
            })
            .await
            .cloned()
    }

    /// Drop every cached provider and the active-KMS memo. Call after any
    /// change to KMS records.
    pub async fn reset_wallet(&self) {
        let mut memo = self.active.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        *memo = None;
        self.wallet.clear();
        drop(memo);
        info!("KMS wallet reset");
    }

    /// Number of providers currently cached.
    pub fn cached_providers(&self) -> usize {
        self.wallet.len()
    }
}
