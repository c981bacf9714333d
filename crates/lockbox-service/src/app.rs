//! Wiring of every service over one store.

use std::sync::Arc;

use lockbox_cache::CacheManager;
use lockbox_core::config::{AuthConfig, KmsConfig};
use lockbox_core::traits::{AuditSink, MetricsSink};
use lockbox_database::{
    ApiKeyStore, FolderStore, GroupStore, ItemStore, KmsStore, MembershipStore, PermissionStore,
    Store, UserStore,
};
use lockbox_kms::{KeyWrapClientFactory, KmsWallet};

use crate::apikey::ApiKeyService;
use crate::folder::{FolderHierarchy, FolderService};
use crate::group::{GroupHierarchy, GroupService};
use crate::item::ItemService;
use crate::kms::KmsService;
use crate::permission::PermissionService;
use crate::user::UserService;

/// Collaborators that sit outside the core.
#[derive(Clone)]
pub struct Collaborators {
    /// Cloud key-wrap client factory.
    pub clients: Arc<dyn KeyWrapClientFactory>,
    /// Audit event sink.
    pub audit: Arc<dyn AuditSink>,
    /// Counter sink.
    pub metrics: Arc<dyn MetricsSink>,
}

/// Every service, sharing one store, one cache, and one KMS wallet.
#[derive(Clone)]
pub struct Lockbox {
    /// Shared cache.
    pub cache: CacheManager,
    /// Shared KMS wallet.
    pub wallet: Arc<KmsWallet>,
    /// Group walks and per-user group sets.
    pub group_hierarchy: Arc<GroupHierarchy>,
    /// Folder walks, permissions, and visible trees.
    pub folder_hierarchy: Arc<FolderHierarchy>,
    /// Folder CRUD.
    pub folders: Arc<FolderService>,
    /// Group CRUD and membership.
    pub groups: Arc<GroupService>,
    /// Folder permission rows.
    pub permissions: Arc<PermissionService>,
    /// Encrypted items.
    pub items: Arc<ItemService>,
    /// KMS administration.
    pub kms: Arc<KmsService>,
    /// API keys.
    pub api_keys: Arc<ApiKeyService>,
    /// Users.
    pub users: Arc<UserService>,
}

impl std::fmt::Debug for Lockbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lockbox")
            .field("cache", &self.cache)
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}

impl Lockbox {
    /// Build every service over `store`.
    pub fn new<S: Store>(
        store: Arc<S>,
        cache: CacheManager,
        kms_config: KmsConfig,
        auth_config: &AuthConfig,
        collaborators: Collaborators,
    ) -> Self {
        let folder_store: Arc<dyn FolderStore> = store.clone();
        let group_store: Arc<dyn GroupStore> = store.clone();
        let membership_store: Arc<dyn MembershipStore> = store.clone();
        let permission_store: Arc<dyn PermissionStore> = store.clone();
        let item_store: Arc<dyn ItemStore> = store.clone();
        let kms_store: Arc<dyn KmsStore> = store.clone();
        let api_key_store: Arc<dyn ApiKeyStore> = store.clone();
        let user_store: Arc<dyn UserStore> = store;

        let Collaborators {
            clients,
            audit,
            metrics,
        } = collaborators;

        let wallet = Arc::new(KmsWallet::new(
            kms_store.clone(),
            kms_config,
            clients,
            metrics,
        ));

        let group_hierarchy = Arc::new(GroupHierarchy::new(
            group_store.clone(),
            membership_store.clone(),
            cache.clone(),
        ));
        let folder_hierarchy = Arc::new(FolderHierarchy::new(
            folder_store.clone(),
            permission_store.clone(),
            group_hierarchy.clone(),
            cache.clone(),
        ));

        let folders = Arc::new(FolderService::new(
            folder_hierarchy.clone(),
            folder_store.clone(),
            item_store.clone(),
            cache.clone(),
            audit.clone(),
        ));
        let groups = Arc::new(GroupService::new(
            group_hierarchy.clone(),
            group_store.clone(),
            membership_store.clone(),
            user_store.clone(),
            cache.clone(),
            audit.clone(),
        ));
        let permissions = Arc::new(PermissionService::new(
            folder_hierarchy.clone(),
            folder_store,
            group_store,
            permission_store,
            cache.clone(),
            audit.clone(),
        ));
        let items = Arc::new(ItemService::new(
            folder_hierarchy.clone(),
            item_store.clone(),
            wallet.clone(),
            audit.clone(),
        ));
        let kms = Arc::new(KmsService::new(
            kms_store,
            item_store,
            api_key_store.clone(),
            wallet.clone(),
            audit.clone(),
        ));
        let api_keys = Arc::new(ApiKeyService::new(
            api_key_store,
            user_store.clone(),
            membership_store.clone(),
            wallet.clone(),
            auth_config,
            audit.clone(),
        ));
        let users = Arc::new(UserService::new(
            user_store,
            membership_store,
            auth_config,
            cache.clone(),
            audit,
        ));

        Self {
            cache,
            wallet,
            group_hierarchy,
            folder_hierarchy,
            folders,
            groups,
            permissions,
            items,
            kms,
            api_keys,
            users,
        }
    }
}
