//! Agora unified caching layer
//!
//! Provides a consistent caching strategy across services with:
//! - Unified key schema with versioning
//! - Negative caching (cache miss sentinel)
//! - TTL jitter to prevent thundering herd

mod error;
mod keys;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, CACHE_VERSION};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

/// Cache miss sentinel value - used for negative caching
pub const CACHE_MISS_SENTINEL: &str = "__agora_cache_miss__";

/// Default TTL values (seconds)
pub mod ttl {
    pub const PCA_BASIS: u64 = 300; // 5 minutes
    pub const NEGATIVE: u64 = 60; // 1 minute for cache miss
}

/// Agora cache client
#[derive(Clone)]
pub struct AgoraCache {
    redis: SharedRedis,
}

impl AgoraCache {
    pub fn new(redis: SharedRedis) -> Self {
        Self { redis }
    }

    /// Check if value is the negative-cache sentinel
    pub fn is_negative_cache(value: &str) -> bool {
        value == CACHE_MISS_SENTINEL
    }

    /// Add jitter to TTL to prevent thundering herd
    fn add_jitter(ttl_secs: u64) -> u64 {
        let jitter_percent = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter = (ttl_secs as f64 * jitter_percent).round() as u64;
        ttl_secs + jitter
    }

    /// Get raw string value (for checking the negative sentinel)
    pub async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.lock().await;
        let result: Option<String> = conn.get(key).await.map_err(CacheError::Redis)?;
        Ok(result)
    }

    /// Set a value in cache with TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> CacheResult<()> {
        let data = serde_json::to_string(value).map_err(CacheError::Serialization)?;
        let ttl_with_jitter = Self::add_jitter(ttl_secs);

        let mut conn = self.redis.lock().await;
        conn.set_ex::<_, _, ()>(key, data, ttl_with_jitter)
            .await
            .map_err(CacheError::Redis)?;

        debug!(key = %key, ttl = ttl_with_jitter, "Cache set");
        Ok(())
    }

    /// Set negative cache (cache miss marker)
    pub async fn set_negative(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        conn.set_ex::<_, _, ()>(key, CACHE_MISS_SENTINEL, ttl::NEGATIVE)
            .await
            .map_err(CacheError::Redis)?;

        debug!(key = %key, "Cache set negative");
        Ok(())
    }

    /// Delete a key from cache
    pub async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(key).await.map_err(CacheError::Redis)?;

        debug!(key = %key, "Cache delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_negative_cache() {
        assert!(AgoraCache::is_negative_cache(CACHE_MISS_SENTINEL));
        assert!(!AgoraCache::is_negative_cache("some_value"));
    }

    #[test]
    fn test_add_jitter() {
        let ttl = 300u64;
        let with_jitter = AgoraCache::add_jitter(ttl);
        // Jitter should be 0-10% of TTL
        assert!(with_jitter >= ttl);
        assert!(with_jitter <= ttl + (ttl / 10));
    }
}
