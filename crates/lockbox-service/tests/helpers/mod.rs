//! Shared test helpers for service integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use lockbox_cache::CacheManager;
use lockbox_core::config::{AuthConfig, KmsConfig};
use lockbox_core::traits::{CounterMetrics, TracingAudit};
use lockbox_database::MemoryStore;
use lockbox_entity::kms::{KmsRecord, KmsType};
use lockbox_entity::user::User;
use lockbox_kms::client::StaticClientFactory;
use lockbox_service::folder::CreateFolderRequest;
use lockbox_service::item::{CreateItemRequest, ItemView};
use lockbox_service::kms::CreateKmsRequest;
use lockbox_service::user::CreateUserRequest;
use lockbox_service::{Collaborators, Lockbox, RequestContext};

/// Test application over an in-memory store.
pub struct TestApp {
    /// Every service.
    pub lockbox: Lockbox,
    /// Backing store, for direct assertions.
    pub store: Arc<MemoryStore>,
    /// Counters recorded by the wallet.
    pub metrics: Arc<CounterMetrics>,
    /// Context of the bootstrap administrator.
    pub admin: RequestContext,
    _master_key: tempfile::NamedTempFile,
    kek: tempfile::NamedTempFile,
}

fn key_file(byte: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp key file");
    writeln!(file, "{}", byte.repeat(32)).expect("write key file");
    file
}

impl TestApp {
    /// Create a test application with one administrator.
    pub async fn new() -> Self {
        Self::with_fallback(false).await
    }

    /// Create a test application whose wallet may fall back to the master
    /// key when no KMS is active.
    pub async fn with_fallback(allow_legacy_fallback: bool) -> Self {
        let master_key = key_file("42");
        let kek = key_file("17");
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(CounterMetrics::new());

        let lockbox = Lockbox::new(
            store.clone(),
            CacheManager::in_memory(),
            KmsConfig {
                master_key_file: master_key.path().to_str().expect("utf-8 path").to_string(),
                allow_legacy_fallback,
            },
            &AuthConfig::default(),
            Collaborators {
                clients: Arc::new(StaticClientFactory::new()),
                audit: Arc::new(TracingAudit),
                metrics: metrics.clone(),
            },
        );

        let admin_user = lockbox
            .users
            .create_user(
                &RequestContext::system(),
                CreateUserRequest {
                    login: "admin".into(),
                    email: "admin@example.com".into(),
                    password: "admin-pass-1".into(),
                    admin: true,
                },
            )
            .await
            .expect("bootstrap admin");

        Self {
            lockbox,
            store,
            metrics,
            admin: RequestContext::new(admin_user.id, true, true),
            _master_key: master_key,
            kek,
        }
    }

    /// Create a regular user and return their context with personal
    /// folders unlocked.
    pub async fn user(&self, login: &str) -> (User, RequestContext) {
        let user = self
            .lockbox
            .users
            .create_user(
                &self.admin,
                CreateUserRequest {
                    login: login.into(),
                    email: format!("{login}@example.com"),
                    password: format!("{login}-pass-1"),
                    admin: false,
                },
            )
            .await
            .expect("create user");
        let ctx = RequestContext::new(user.id.clone(), false, true);
        (user, ctx)
    }

    /// Config for a local-file KMS using the test key-encryption key.
    pub fn local_kms_config(&self) -> String {
        format!(
            r#"{{"path":"{}"}}"#,
            self.kek.path().to_str().expect("utf-8 path")
        )
    }

    /// Register a KMS and make it active.
    pub async fn active_kms(&self, kms_type: KmsType, description: &str) -> KmsRecord {
        let config = match kms_type {
            KmsType::NoDek => "{}".to_string(),
            KmsType::LocalFile => self.local_kms_config(),
            KmsType::Cloud => r#"{"key_name":"projects/p/locations/l/keyRings/r/cryptoKeys/k","token":"t"}"#.to_string(),
        };
        let record = self
            .lockbox
            .kms
            .create_kms(
                &self.admin,
                CreateKmsRequest {
                    kms_type,
                    description: description.into(),
                    config,
                },
            )
            .await
            .expect("create kms");
        self.lockbox
            .kms
            .activate_kms(&self.admin, &record.id)
            .await
            .expect("activate kms")
    }

    /// Create a folder as the administrator.
    pub async fn folder(&self, parent: &str, description: &str) -> String {
        self.lockbox
            .folders
            .create_folder(
                &self.admin,
                CreateFolderRequest {
                    parent: parent.into(),
                    description: description.into(),
                },
            )
            .await
            .expect("create folder")
            .id
    }

    /// Create an item.
    pub async fn item(&self, ctx: &RequestContext, folder_id: &str, data: &str) -> ItemView {
        self.lockbox
            .items
            .create_item(
                ctx,
                CreateItemRequest {
                    folder_id: folder_id.into(),
                    title: format!("item-{data}"),
                    description: format!("about {data}"),
                    data: data.into(),
                    metadata: String::new(),
                },
            )
            .await
            .expect("create item")
    }
}
