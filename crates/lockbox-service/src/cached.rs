//! Best-effort cache access.
//!
//! The cache is an optimization: a failed read is a miss and a failed write
//! is dropped, both logged.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use lockbox_cache::CacheManager;
use lockbox_core::traits::CacheProvider;

pub(crate) async fn read<T: DeserializeOwned + Send>(cache: &CacheManager, key: &str) -> Option<T> {
    match cache.get_json::<T>(key).await {
        Ok(Some(value)) => {
            debug!(key, "Cache hit");
            Some(value)
        }
        Ok(None) => {
            debug!(key, "Cache miss");
            None
        }
        Err(e) => {
            warn!(key, error = %e, "Cache read failed");
            None
        }
    }
}

pub(crate) async fn write<T: Serialize + Send + Sync>(cache: &CacheManager, key: &str, value: &T) {
    if let Err(e) = cache.set_json(key, value).await {
        warn!(key, error = %e, "Cache write failed");
    }
}
