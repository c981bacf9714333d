use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use lockbox_core::config::KmsConfig;
use lockbox_core::error::ErrorKind;
use lockbox_core::result::AppResult;
use lockbox_core::traits::CounterMetrics;
use lockbox_database::{KmsStore, MemoryStore};
use lockbox_entity::kms::{KmsRecord, KmsType};
use lockbox_kms::client::StaticClientFactory;
use lockbox_kms::wallet::{DECRYPT_COUNTER, ENCRYPT_COUNTER};
use lockbox_kms::KmsWallet;

struct Fixture {
    store: Arc<MemoryStore>,
    metrics: Arc<CounterMetrics>,
    wallet: KmsWallet,
    _master: tempfile::NamedTempFile,
    kek: tempfile::NamedTempFile,
}

fn key_file(byte: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", byte.repeat(32)).unwrap();
    file
}

fn fixture(allow_legacy_fallback: bool) -> Fixture {
    let master = key_file("42");
    let kek = key_file("17");
    let store = Arc::new(MemoryStore::new());
    let metrics = Arc::new(CounterMetrics::new());
    let config = KmsConfig {
        master_key_file: master.path().to_str().unwrap().to_string(),
        allow_legacy_fallback,
    };
    let wallet = KmsWallet::new(
        store.clone(),
        config,
        Arc::new(StaticClientFactory::new()),
        metrics.clone(),
    );
    Fixture {
        store,
        metrics,
        wallet,
        _master: master,
        kek,
    }
}

async fn add_kms(store: &MemoryStore, id: &str, kms_type: KmsType, config: &str) {
    let now = Utc::now();
    store
        .create_kms(&KmsRecord {
            id: id.to_string(),
            kms_type,
            description: format!("{id}-desc"),
            config: config.to_string(),
            active: false,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn no_active_kms_is_an_error() {
    let f = fixture(false);
    let err = f.wallet.encrypt(b"secret").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Kms);
    assert_eq!(err.message, "No active KMS");
}

#[tokio::test]
async fn legacy_fallback_when_enabled() {
    let f = fixture(true);
    let envelope = f.wallet.encrypt(b"legacy").await.unwrap();
    assert!(envelope.kms_id.is_none());
    assert!(envelope.dek.is_none());
    assert_eq!(f.wallet.decrypt(&envelope).await.unwrap().as_slice(), b"legacy");
}

#[tokio::test]
async fn active_kms_encrypts_and_old_data_stays_readable() {
    let f = fixture(false);
    let local_cfg = format!(r#"{{"path":"{}"}}"#, f.kek.path().to_str().unwrap());
    add_kms(&f.store, "local", KmsType::LocalFile, &local_cfg).await;
    add_kms(
        &f.store,
        "cloud",
        KmsType::Cloud,
        r#"{"key_name":"projects/p/locations/l/keyRings/r/cryptoKeys/k","token":"t"}"#,
    )
    .await;

    f.store.activate_kms("local").await.unwrap();
    let first = f.wallet.encrypt(b"one").await.unwrap();
    assert_eq!(first.kms_id.as_deref(), Some("local"));

    // The memo survives until reset.
    f.store.activate_kms("cloud").await.unwrap();
    assert_eq!(f.wallet.active_kms_id().await.unwrap().as_deref(), Some("local"));
    f.wallet.reset_wallet().await;
    assert_eq!(f.wallet.cached_providers(), 0);

    let second = f.wallet.encrypt(b"two").await.unwrap();
    assert_eq!(second.kms_id.as_deref(), Some("cloud"));

    assert_eq!(f.wallet.decrypt(&first).await.unwrap().as_slice(), b"one");
    assert_eq!(f.wallet.decrypt_string(&second).await.unwrap(), "two");
    assert_eq!(f.wallet.cached_providers(), 2);
}

#[tokio::test]
async fn counters_track_global_and_per_provider() {
    let f = fixture(false);
    add_kms(&f.store, "plain", KmsType::NoDek, "{}").await;
    f.store.activate_kms("plain").await.unwrap();

    let envelope = f.wallet.encrypt(b"a").await.unwrap();
    f.wallet.encrypt(b"b").await.unwrap();
    f.wallet.decrypt(&envelope).await.unwrap();

    assert_eq!(f.metrics.get(ENCRYPT_COUNTER, None), 2);
    assert_eq!(f.metrics.get(ENCRYPT_COUNTER, Some("plain-desc")), 2);
    assert_eq!(f.metrics.get(DECRYPT_COUNTER, None), 1);
    assert_eq!(f.metrics.get(DECRYPT_COUNTER, Some("plain-desc")), 1);
}

#[tokio::test]
async fn probe_checks_key_material_without_caching() {
    let f = fixture(false);
    let now = Utc::now();
    let mut record = KmsRecord {
        id: "candidate".to_string(),
        kms_type: KmsType::LocalFile,
        description: "candidate".to_string(),
        config: format!(r#"{{"path":"{}"}}"#, f.kek.path().to_str().unwrap()),
        active: false,
        created_at: now,
        updated_at: now,
    };
    f.wallet.probe(&record).await.unwrap();
    assert_eq!(f.wallet.cached_providers(), 0);
    assert_eq!(f.metrics.get(ENCRYPT_COUNTER, None), 0);

    record.config = r#"{"path":"/nonexistent/kek.hex"}"#.to_string();
    assert!(f.wallet.probe(&record).await.is_err());
}

#[tokio::test]
async fn unknown_kms_on_decrypt_is_not_found() {
    let f = fixture(true);
    let mut envelope = f.wallet.encrypt(b"x").await.unwrap();
    envelope.kms_id = Some("gone".to_string());
    let err = f.wallet.decrypt(&envelope).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_lookups_share_one_provider() {
    let f = Arc::new(fixture(false));
    add_kms(&f.store, "plain", KmsType::NoDek, "{}").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let f = f.clone();
        handles.push(tokio::spawn(async move { f.wallet.provider("plain").await.unwrap() }));
    }
    let providers: Vec<_> = join_all(handles).await;
    assert_eq!(f.wallet.cached_providers(), 1);
    let first = f.wallet.provider("plain").await.unwrap();
    assert!(providers.iter().all(|p| p.describe() == first.describe()));
}

/// Holds the first active-KMS lookup open after it has read the store.
struct GatedStore {
    inner: Arc<MemoryStore>,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl KmsStore for GatedStore {
    async fn find_kms(&self, id: &str) -> AppResult<Option<KmsRecord>> {
        self.inner.find_kms(id).await
    }

    async fn find_active_kms(&self) -> AppResult<Option<KmsRecord>> {
        let record = self.inner.find_active_kms().await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(record)
    }

    async fn list_kms(&self) -> AppResult<Vec<KmsRecord>> {
        self.inner.list_kms().await
    }

    async fn create_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        self.inner.create_kms(record).await
    }

    async fn update_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        self.inner.update_kms(record).await
    }

    async fn activate_kms(&self, id: &str) -> AppResult<()> {
        self.inner.activate_kms(id).await
    }

    async fn delete_kms(&self, id: &str) -> AppResult<()> {
        self.inner.delete_kms(id).await
    }
}

#[tokio::test]
async fn lookup_racing_a_reset_does_not_memoize_stale_id() {
    let master = key_file("42");
    let inner = Arc::new(MemoryStore::new());
    add_kms(&inner, "old", KmsType::NoDek, "{}").await;
    add_kms(&inner, "new", KmsType::NoDek, "{}").await;
    inner.activate_kms("old").await.unwrap();

    let gated = Arc::new(GatedStore {
        inner: inner.clone(),
        armed: AtomicBool::new(true),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let wallet = Arc::new(KmsWallet::new(
        gated.clone(),
        KmsConfig {
            master_key_file: master.path().to_str().unwrap().to_string(),
            allow_legacy_fallback: false,
        },
        Arc::new(StaticClientFactory::new()),
        Arc::new(CounterMetrics::new()),
    ));

    let lookup = tokio::spawn({
        let wallet = wallet.clone();
        async move { wallet.active_kms_id().await.unwrap() }
    });
    gated.entered.notified().await;
    inner.activate_kms("new").await.unwrap();
    wallet.reset_wallet().await;
    gated.release.notify_one();

    // The in-flight caller still sees what it read.
    assert_eq!(lookup.await.unwrap().as_deref(), Some("old"));
    assert_eq!(wallet.active_kms_id().await.unwrap().as_deref(), Some("new"));
    let envelope = wallet.encrypt(b"after reset").await.unwrap();
    assert_eq!(envelope.kms_id.as_deref(), Some("new"));
}

#[tokio::test]
async fn active_provider_seals_every_field_with_one_kms() {
    let f = fixture(false);
    add_kms(&f.store, "first", KmsType::NoDek, "{}").await;
    add_kms(&f.store, "second", KmsType::NoDek, "{}").await;
    f.store.activate_kms("first").await.unwrap();

    let provider = f.wallet.active_provider().await.unwrap();
    let title = f.wallet.seal(&provider, b"title").await.unwrap();
    f.store.activate_kms("second").await.unwrap();
    f.wallet.reset_wallet().await;
    let body = f.wallet.seal(&provider, b"body").await.unwrap();

    assert_eq!(title.kms_id.as_deref(), Some("first"));
    assert_eq!(body.kms_id, title.kms_id);
    assert_eq!(f.wallet.decrypt(&body).await.unwrap().as_slice(), b"body");
    assert_eq!(f.metrics.get(ENCRYPT_COUNTER, Some("first-desc")), 2);
}

async fn join_all<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}
