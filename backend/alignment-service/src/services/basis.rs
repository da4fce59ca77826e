//! PCA basis cache
//!
//! Fetches the current principal-component basis for a topic scope from the
//! upstream statistical service and caches it in Redis with a short TTL.
//! Every failure mode (unreachable service, timeout, no basis yet) degrades
//! to "no ideological information available", never an error to the caller.

use crate::error::{ServiceError, ServiceResult};
use crate::models::PcaBasis;
use agora_cache::{AgoraCache, CacheKey, CacheResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Source of the current PCA basis per scope
#[async_trait]
pub trait BasisSource: Send + Sync {
    async fn get_basis(&self, scope_id: Uuid) -> ServiceResult<Option<PcaBasis>>;
}

/// Raw math output reported by the statistical service for one scope
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeMathOutput {
    pub components: Vec<Vec<f64>>,
    pub center: Vec<f64>,
    #[serde(default)]
    pub cluster_centers: Vec<Vec<f64>>,
    pub version: String,
}

/// Upstream statistical service; idempotent query-by-scope
#[async_trait]
pub trait BasisProvider: Send + Sync {
    /// Ok(None) means the scope has no basis yet (new or tiny scope)
    async fn fetch(&self, scope_id: Uuid) -> ServiceResult<Option<ScopeMathOutput>>;
}

/// HTTP client for the statistical service
pub struct MathServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl MathServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BasisProvider for MathServiceClient {
    async fn fetch(&self, scope_id: Uuid) -> ServiceResult<Option<ScopeMathOutput>> {
        let url = format!("{}/scopes/{}/math", self.base_url, scope_id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let output = response
            .error_for_status()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?
            .json::<ScopeMathOutput>()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        Ok(Some(output))
    }
}

/// Cache operations the basis service needs; implemented by the shared
/// Redis cache in production
#[async_trait]
pub trait BasisCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set_basis(&self, key: &str, basis: &PcaBasis, ttl_secs: u64) -> CacheResult<()>;
    async fn set_negative(&self, key: &str) -> CacheResult<()>;
    async fn del(&self, key: &str) -> CacheResult<()>;
}

#[async_trait]
impl BasisCache for AgoraCache {
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        AgoraCache::get_raw(self, key).await
    }

    async fn set_basis(&self, key: &str, basis: &PcaBasis, ttl_secs: u64) -> CacheResult<()> {
        self.set(key, basis, ttl_secs).await
    }

    async fn set_negative(&self, key: &str) -> CacheResult<()> {
        AgoraCache::set_negative(self, key).await
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        AgoraCache::del(self, key).await
    }
}

/// Cache-aside wrapper over the statistical service
pub struct PcaBasisService {
    cache: Arc<dyn BasisCache>,
    provider: Arc<dyn BasisProvider>,
    ttl_secs: u64,
}

impl PcaBasisService {
    pub fn new(cache: Arc<dyn BasisCache>, provider: Arc<dyn BasisProvider>, ttl_secs: u64) -> Self {
        Self {
            cache,
            provider,
            ttl_secs,
        }
    }
}

#[async_trait]
impl BasisSource for PcaBasisService {
    async fn get_basis(&self, scope_id: Uuid) -> ServiceResult<Option<PcaBasis>> {
        let key = CacheKey::scope_basis(scope_id);

        // Cache errors degrade to a miss; the upstream fetch below still runs
        match self.cache.get_raw(&key).await {
            Ok(Some(raw)) => {
                if AgoraCache::is_negative_cache(&raw) {
                    debug!(scope_id = %scope_id, "PCA basis negative cache hit");
                    return Ok(None);
                }
                match serde_json::from_str::<PcaBasis>(&raw) {
                    Ok(basis) => {
                        debug!(scope_id = %scope_id, version = %basis.version, "PCA basis cache hit");
                        return Ok(Some(basis));
                    }
                    Err(e) => {
                        warn!(scope_id = %scope_id, error = %e, "Corrupt cached basis, refetching");
                        let _ = self.cache.del(&key).await;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(scope_id = %scope_id, error = %e, "Basis cache read failed");
            }
        }

        match self.provider.fetch(scope_id).await {
            Ok(Some(output)) => {
                let Some(basis) = build_basis(output) else {
                    debug!(scope_id = %scope_id, "Statistical service reported incomplete math output");
                    let _ = self.cache.set_negative(&key).await;
                    return Ok(None);
                };

                if let Err(e) = self.cache.set_basis(&key, &basis, self.ttl_secs).await {
                    warn!(scope_id = %scope_id, error = %e, "Basis cache write failed");
                }
                Ok(Some(basis))
            }
            Ok(None) => {
                debug!(scope_id = %scope_id, "No PCA basis yet for scope");
                let _ = self.cache.set_negative(&key).await;
                Ok(None)
            }
            Err(e) => {
                // Unreachable upstream is treated identically to "no basis yet"
                warn!(scope_id = %scope_id, error = %e, "Statistical service unavailable");
                Ok(None)
            }
        }
    }
}

fn build_basis(output: ScopeMathOutput) -> Option<PcaBasis> {
    let mut components = output.components.into_iter();
    let first = components.next()?;
    let second = components.next()?;

    Some(PcaBasis {
        components: [first, second],
        center: output.center,
        max_distance: max_pairwise_distance(&output.cluster_centers),
        version: output.version,
    })
}

/// Greatest pairwise Euclidean distance between cluster centroids;
/// None when fewer than two centroids exist.
fn max_pairwise_distance(centers: &[Vec<f64>]) -> Option<f64> {
    if centers.len() < 2 {
        return None;
    }

    let mut max = 0.0_f64;
    for (i, a) in centers.iter().enumerate() {
        for b in centers.iter().skip(i + 1) {
            let dist = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt();
            max = max.max(dist);
        }
    }

    Some(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_cache::CACHE_MISS_SENTINEL;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl BasisCache for MemCache {
        async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set_basis(&self, key: &str, basis: &PcaBasis, _ttl_secs: u64) -> CacheResult<()> {
            let data = serde_json::to_string(basis)?;
            self.entries.lock().await.insert(key.to_string(), data);
            Ok(())
        }

        async fn set_negative(&self, key: &str) -> CacheResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), CACHE_MISS_SENTINEL.to_string());
            Ok(())
        }

        async fn del(&self, key: &str) -> CacheResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl BasisProvider for FailingProvider {
        async fn fetch(&self, _scope_id: Uuid) -> ServiceResult<Option<ScopeMathOutput>> {
            Err(ServiceError::Upstream("connection refused".to_string()))
        }
    }

    struct CountingProvider {
        output: Option<ScopeMathOutput>,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(output: Option<ScopeMathOutput>) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BasisProvider for CountingProvider {
        async fn fetch(&self, _scope_id: Uuid) -> ServiceResult<Option<ScopeMathOutput>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn sample_output() -> ScopeMathOutput {
        ScopeMathOutput {
            components: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            center: vec![0.0, 0.0],
            cluster_centers: vec![],
            version: "3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_degrades_to_none() {
        let cache = Arc::new(MemCache::default());
        let service = PcaBasisService::new(cache.clone(), Arc::new(FailingProvider), 300);

        let result = service.get_basis(Uuid::new_v4()).await;
        assert!(matches!(result, Ok(None)));
        // Upstream failure is not cached as "no basis"
        assert!(cache.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_negative_sentinel_short_circuits_upstream() {
        let scope_id = Uuid::new_v4();
        let cache = Arc::new(MemCache::default());
        cache.set_negative(&CacheKey::scope_basis(scope_id)).await.unwrap();

        let provider = Arc::new(CountingProvider::new(Some(sample_output())));
        let service = PcaBasisService::new(cache, provider.clone(), 300);

        let result = service.get_basis(scope_id).await.unwrap();
        assert!(result.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_basis_yet_is_negatively_cached() {
        let scope_id = Uuid::new_v4();
        let cache = Arc::new(MemCache::default());
        let provider = Arc::new(CountingProvider::new(None));
        let service = PcaBasisService::new(cache.clone(), provider, 300);

        let result = service.get_basis(scope_id).await.unwrap();
        assert!(result.is_none());

        let entries = cache.entries.lock().await;
        assert_eq!(
            entries.get(&CacheKey::scope_basis(scope_id)).map(String::as_str),
            Some(CACHE_MISS_SENTINEL)
        );
    }

    #[tokio::test]
    async fn test_fetch_populates_cache_and_second_read_hits() {
        let scope_id = Uuid::new_v4();
        let cache = Arc::new(MemCache::default());
        let provider = Arc::new(CountingProvider::new(Some(sample_output())));
        let service = PcaBasisService::new(cache, provider.clone(), 300);

        let first = service.get_basis(scope_id).await.unwrap().unwrap();
        assert_eq!(first.version, "3");

        let second = service.get_basis(scope_id).await.unwrap().unwrap();
        assert_eq!(second.version, "3");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_refetched() {
        let scope_id = Uuid::new_v4();
        let key = CacheKey::scope_basis(scope_id);
        let cache = Arc::new(MemCache::default());
        cache
            .entries
            .lock()
            .await
            .insert(key.clone(), "{not json".to_string());

        let provider = Arc::new(CountingProvider::new(Some(sample_output())));
        let service = PcaBasisService::new(cache.clone(), provider.clone(), 300);

        let basis = service.get_basis(scope_id).await.unwrap().unwrap();
        assert_eq!(basis.version, "3");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let entries = cache.entries.lock().await;
        let cached = entries.get(&key).unwrap();
        assert!(serde_json::from_str::<PcaBasis>(cached).is_ok());
    }

    #[test]
    fn test_max_distance_requires_two_centroids() {
        assert_eq!(max_pairwise_distance(&[]), None);
        assert_eq!(max_pairwise_distance(&[vec![1.0, 2.0]]), None);
    }

    #[test]
    fn test_max_distance_is_greatest_pair() {
        let centers = vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]];
        let dist = max_pairwise_distance(&centers).unwrap();
        assert!((dist - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_basis_needs_two_components() {
        let output = ScopeMathOutput {
            components: vec![vec![1.0, 0.0]],
            center: vec![0.0, 0.0],
            cluster_centers: vec![],
            version: "7".to_string(),
        };
        assert!(build_basis(output).is_none());
    }

    #[test]
    fn test_build_basis_derives_max_distance() {
        let output = ScopeMathOutput {
            components: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            center: vec![0.0, 0.0],
            cluster_centers: vec![vec![-1.0, 0.0], vec![1.0, 0.0]],
            version: "7".to_string(),
        };
        let basis = build_basis(output).unwrap();
        assert_eq!(basis.max_distance, Some(2.0));
        assert_eq!(basis.version, "7");
    }
}
