//! In-memory cache implementation using the moka crate.

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use lockbox_core::config::MemoryCacheConfig;
use lockbox_core::result::AppResult;
use lockbox_core::traits::CacheProvider;

/// In-memory cache provider using moka. Entries live until removed or
/// evicted for capacity.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, String>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder().max_capacity(config.max_capacity).build();
        Self { cache }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        // moka has no key scan by prefix, so walk the entries.
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.0.starts_with(prefix))
            .map(|entry| entry.0.to_string())
            .collect();

        let mut count = 0u64;
        for key in keys {
            if self.cache.remove(&key).await.is_some() {
                count += 1;
            }
        }

        debug!(prefix, count, "Deleted keys by prefix");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let provider = make_provider();
        provider.set("k1", "v1").await.unwrap();
        assert_eq!(provider.get("k1").await.unwrap(), Some("v1".to_string()));
        provider.delete("k1").await.unwrap();
        assert_eq!(provider.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let provider = make_provider();
        provider.set("k", "a").await.unwrap();
        provider.set("k", "b").await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let provider = make_provider();
        for key in ["folders.tree.u1", "folders.perm.u1.f1", "folders.perm.u2.f1", "groups.tree"] {
            provider.set(key, "x").await.unwrap();
        }

        let removed = provider.delete_prefix("folders.perm.u1.").await.unwrap();
        assert_eq!(removed, 1);
        assert!(provider.get("folders.perm.u2.f1").await.unwrap().is_some());

        let removed = provider.delete_prefix("folders.").await.unwrap();
        assert_eq!(removed, 2);
        assert!(provider.get("groups.tree").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let provider = make_provider();
        let data = serde_json::json!({"read": true, "write": false});
        provider.set_json("perm", &data).await.unwrap();
        let result: Option<serde_json::Value> = provider.get_json("perm").await.unwrap();
        assert_eq!(result, Some(data));
    }
}
