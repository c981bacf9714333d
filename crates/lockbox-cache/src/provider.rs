//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use lockbox_core::config::{CacheConfig, MemoryCacheConfig};
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::CacheProvider;

use crate::keys;

/// Cache manager that wraps the configured cache provider.
///
/// Besides plain dispatch it offers the invalidation helpers used by every
/// writer. Those are best-effort: a failing cache is logged and never fails
/// the write that triggered it.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCacheProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    max_capacity = config.memory.max_capacity,
                    "Initializing in-memory cache provider"
                );
                Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// In-memory cache with default capacity.
    #[cfg(feature = "memory")]
    pub fn in_memory() -> Self {
        Self::from_provider(Arc::new(crate::memory::MemoryCacheProvider::new(
            &MemoryCacheConfig::default(),
        )))
    }

    /// Create a cache manager from an existing provider.
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self { inner: provider }
    }

    /// Drop cached folder trees, readable sets, and permissions, for one
    /// user or for everyone.
    pub async fn invalidate_folders(&self, user_id: Option<&str>) {
        let result = match user_id {
            Some(user) => self.invalidate_user_folders(user).await,
            None => self.inner.delete_prefix(&keys::namespace(keys::FOLDERS)).await,
        };
        match result {
            Ok(count) => info!(user_id = ?user_id, count, "Invalidated folder cache"),
            Err(e) => warn!(user_id = ?user_id, error = %e, "Failed to invalidate folder cache"),
        }
    }

    /// Drop the cached group catalogue and every user's group set.
    pub async fn invalidate_groups(&self) {
        match self.inner.delete_prefix(&keys::namespace(keys::GROUPS)).await {
            Ok(count) => info!(count, "Invalidated group cache"),
            Err(e) => warn!(error = %e, "Failed to invalidate group cache"),
        }
    }

    /// Drop one user's cached group set.
    pub async fn invalidate_user_groups(&self, user_id: &str) {
        if let Err(e) = self.inner.delete(&keys::user_groups(user_id)).await {
            warn!(user_id, error = %e, "Failed to invalidate user groups");
        }
    }

    async fn invalidate_user_folders(&self, user_id: &str) -> AppResult<u64> {
        self.inner.delete(&keys::folder_tree(user_id)).await?;
        self.inner.delete(&keys::folder_readable(user_id)).await?;
        let perms = self
            .inner
            .delete_prefix(&keys::folder_permission_prefix(user_id))
            .await?;
        Ok(perms + 2)
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        self.inner.delete_prefix(prefix).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.inner.flush_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl CacheProvider for BrokenCache {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::cache("down"))
        }
        async fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::cache("down"))
        }
        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::cache("down"))
        }
        async fn delete_prefix(&self, _prefix: &str) -> AppResult<u64> {
            Err(AppError::cache("down"))
        }
        async fn health_check(&self) -> AppResult<bool> {
            Ok(false)
        }
        async fn flush_all(&self) -> AppResult<()> {
            Err(AppError::cache("down"))
        }
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let config = CacheConfig {
            provider: "memcached".to_string(),
            ..CacheConfig::default()
        };
        let err = CacheManager::new(&config).await.unwrap_err();
        assert!(err.message.contains("memcached"));
    }

    #[tokio::test]
    async fn test_invalidate_one_user() {
        let cache = CacheManager::in_memory();
        for key in [
            keys::folder_tree("u1"),
            keys::folder_readable("u1"),
            keys::folder_permission("u1", "f1"),
            keys::folder_tree("u2"),
            keys::folder_permission("u2", "f1"),
        ] {
            cache.set(&key, "x").await.unwrap();
        }

        cache.invalidate_folders(Some("u1")).await;
        assert!(cache.get(&keys::folder_tree("u1")).await.unwrap().is_none());
        assert!(cache.get(&keys::folder_permission("u1", "f1")).await.unwrap().is_none());
        assert!(cache.get(&keys::folder_tree("u2")).await.unwrap().is_some());

        cache.invalidate_folders(None).await;
        assert!(cache.get(&keys::folder_permission("u2", "f1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidation_never_fails() {
        let cache = CacheManager::from_provider(Arc::new(BrokenCache));
        cache.invalidate_folders(Some("u1")).await;
        cache.invalidate_folders(None).await;
        cache.invalidate_groups().await;
        cache.invalidate_user_groups("u1").await;
    }
}
