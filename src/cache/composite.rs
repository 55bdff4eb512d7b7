// Ordered chain of cache backends. Reads fall back level by level past
// faults and misses; writes fan out to every backend in parallel and
// succeed when at least one backend accepted the value.

use crate::cache::{CacheBackend, CacheError, CacheMetadata};
use crate::models::Tournament;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Upper bound on concurrently running promotion backfills. When the
/// permits are exhausted, promotion is skipped rather than queued.
const PROMOTION_PERMITS: usize = 16;

pub struct CompositeCache {
    backends: Vec<Arc<dyn CacheBackend>>,
    promotion: Option<Arc<Semaphore>>,
}

impl CompositeCache {
    pub fn new(backends: Vec<Arc<dyn CacheBackend>>, promotion: bool) -> Self {
        assert!(!backends.is_empty(), "composite cache requires at least one backend");
        Self {
            backends,
            promotion: promotion.then(|| Arc::new(Semaphore::new(PROMOTION_PERMITS))),
        }
    }

    /// Backfill levels above a hit, fire-and-forget. Uses the TTL the hit
    /// level reports so the copies expire together; failures are ignored.
    fn promote(&self, key: &str, hit_level: usize, value: Tournament) {
        let Some(semaphore) = &self.promotion else {
            return;
        };
        let Ok(permit) = semaphore.clone().try_acquire_owned() else {
            debug!("Promotion queue saturated, skipping backfill for {}", key);
            return;
        };
        let source = self.backends[hit_level].clone();
        let uppers: Vec<Arc<dyn CacheBackend>> = self.backends[..hit_level].to_vec();
        let key = key.to_string();
        tokio::spawn(async move {
            let _permit = permit;
            let remaining = match source.metadata(&key).await {
                Ok(Some(meta)) if meta.ttl > 0 => Duration::from_secs(meta.ttl as u64),
                _ => return,
            };
            for backend in uppers {
                if let Err(e) = backend.set(&key, &value, remaining).await {
                    debug!("Promotion into {} failed for {}: {}", backend.name(), key, e);
                }
            }
        });
    }
}

#[async_trait]
impl CacheBackend for CompositeCache {
    async fn get(&self, key: &str) -> Result<Option<Tournament>, CacheError> {
        for (level, backend) in self.backends.iter().enumerate() {
            match backend.get(key).await {
                Ok(Some(value)) => {
                    if level > 0 {
                        debug!("Cache hit for {} at level {} ({})", key, level, backend.name());
                        self.promote(key, level, value.clone());
                    }
                    return Ok(Some(value));
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cache read fault in {}, falling through: {}", backend.name(), e);
                    continue;
                }
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Tournament, ttl: Duration) -> Result<(), CacheError> {
        let results = join_all(self.backends.iter().map(|b| b.set(key, value, ttl))).await;
        collect_write_results(&self.backends, results, "set")
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let results = join_all(self.backends.iter().map(|b| b.del(key))).await;
        for (backend, result) in self.backends.iter().zip(results) {
            if let Err(e) = result {
                warn!("Cache delete fault in {}: {}", backend.name(), e);
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        for backend in &self.backends {
            match backend.exists(key).await {
                Ok(true) => return Ok(true),
                Ok(false) => continue,
                Err(e) => {
                    warn!("Cache read fault in {}, falling through: {}", backend.name(), e);
                    continue;
                }
            }
        }
        Ok(false)
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, CacheError> {
        for backend in &self.backends {
            match backend.metadata(key).await {
                Ok(Some(meta)) => return Ok(Some(meta)),
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cache read fault in {}, falling through: {}", backend.name(), e);
                    continue;
                }
            }
        }
        Ok(None)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let results = join_all(self.backends.iter().map(|b| b.clear())).await;
        collect_write_results(&self.backends, results, "clear")
    }

    async fn close(&self) -> Result<(), CacheError> {
        let results = join_all(self.backends.iter().map(|b| b.close())).await;
        collect_write_results(&self.backends, results, "close")
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.backends.iter().map(|b| b.name()).collect();
        format!("Composite({})", names.join(" → "))
    }
}

/// Partial failure is tolerated: warn and report success while any backend
/// accepted the write, fail only when every backend refused it.
fn collect_write_results(
    backends: &[Arc<dyn CacheBackend>],
    results: Vec<Result<(), CacheError>>,
    operation: &str,
) -> Result<(), CacheError> {
    let mut succeeded = 0usize;
    let mut failures: Vec<String> = Vec::new();
    for (backend, result) in backends.iter().zip(results) {
        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                warn!("Cache {} fault in {}: {}", operation, backend.name(), e);
                failures.push(format!("{}: {}", backend.name(), e));
            }
        }
    }
    if succeeded == 0 {
        return Err(CacheError::AllBackendsFailed(failures.join("; ")));
    }
    Ok(())
}
