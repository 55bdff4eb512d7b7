// Pluggable cache stack. Backends share one contract; the factory picks
// memory-only or a [redis, memory] composite from configuration.

pub mod composite;
pub mod keys;
pub mod memory;
pub mod remote;
pub mod ttl;

use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::Tournament;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("TTL must be at least one second")]
    InvalidTtl,

    #[error("remote cache is not connected")]
    Disconnected,

    #[error("remote cache error: {0}")]
    Remote(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),

    #[error("all cache backends failed: {0}")]
    AllBackendsFailed(String),
}

/// Remaining-lifetime view of a cache entry. Derived on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub key: String,
    /// Whole seconds remaining before expiry.
    pub ttl: i64,
    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub expires_at: i64,
}

/// Contract shared by every cache backend.
///
/// `get` returns `Ok(None)` for both absent and expired keys and never
/// resurrects an expired value. `set` overwrites an existing entry wholesale.
/// Backend faults are `Err`, distinguishable from an empty `Ok(None)`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Tournament>, CacheError>;

    async fn set(&self, key: &str, value: &Tournament, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key succeeds silently.
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    async fn close(&self) -> Result<(), CacheError>;

    fn name(&self) -> String;
}

/// Select the cache stack from configuration: a [redis, memory] composite
/// when REMOTE_CACHE_URL is set, the in-memory backend alone otherwise.
///
/// A remote backend that fails its initial connection still joins the
/// composite; its operations fail fast and reads fall through to memory.
pub async fn init_cache(config: &Config) -> Arc<dyn CacheBackend> {
    let memory = Arc::new(memory::MemoryCache::new(config.cache_sweep_interval));

    match &config.remote_cache_url {
        Some(url) => match remote::RemoteCache::connect(url).await {
            Ok(remote) => {
                if remote.is_connected() {
                    info!("Remote cache connected");
                } else {
                    warn!("Remote cache unreachable; reads will fall through to memory until it reconnects");
                }
                let backends: Vec<Arc<dyn CacheBackend>> = vec![Arc::new(remote), memory];
                Arc::new(composite::CompositeCache::new(backends, config.cache_promotion))
            }
            Err(e) => {
                warn!("Invalid remote cache URL, using in-memory cache only: {}", e);
                memory
            }
        },
        None => memory,
    }
}
