// In-memory cache backend. Entries carry millisecond-precision expiry; a
// background task sweeps expired entries on a fixed interval and reads
// evict lazily, so an expired value is never returned.

use crate::cache::{CacheBackend, CacheError, CacheMetadata};
use crate::models::Tournament;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone)]
struct StoredEntry {
    value: Tournament,
    created_at_ms: i64,
    expires_at_ms: i64,
}

impl StoredEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

pub struct MemoryCache {
    entries: Arc<DashMap<String, StoredEntry>>,
    sweeper: CancellationToken,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl MemoryCache {
    pub fn new(sweep_interval: Duration) -> Self {
        let entries: Arc<DashMap<String, StoredEntry>> = Arc::new(DashMap::new());
        let sweeper = CancellationToken::new();

        let sweep_entries = entries.clone();
        let sweep_token = sweeper.clone();
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            // The immediate first tick would sweep an empty map.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = sweep_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = now_ms();
                        let before = sweep_entries.len();
                        sweep_entries.retain(|_, entry| !entry.is_expired(now));
                        let removed = before.saturating_sub(sweep_entries.len());
                        if removed > 0 {
                            debug!("Memory cache sweep removed {} expired entries", removed);
                        }
                    }
                }
            }
        });

        Self { entries, sweeper }
    }

    /// Remove the entry if it is expired, without ever handing it back.
    fn evict_if_expired(&self, key: &str, now: i64) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn live_entry(&self, key: &str) -> Option<StoredEntry> {
        let now = now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Some(entry.value().clone()),
            None => return None,
        };
        if expired {
            self.evict_if_expired(key, now);
        }
        None
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Tournament>, CacheError> {
        Ok(self.live_entry(key).map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &Tournament, ttl: Duration) -> Result<(), CacheError> {
        if ttl.as_secs() == 0 {
            return Err(CacheError::InvalidTtl);
        }
        let now = now_ms();
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.clone(),
                created_at_ms: now,
                expires_at_ms: now + ttl.as_millis() as i64,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live_entry(key).is_some())
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, CacheError> {
        let Some(entry) = self.live_entry(key) else {
            return Ok(None);
        };
        let remaining_ms = entry.expires_at_ms - now_ms();
        Ok(Some(CacheMetadata {
            key: key.to_string(),
            // Round up so a just-written entry reports its full TTL.
            ttl: (remaining_ms + 999) / 1000,
            created_at: entry.created_at_ms / 1000,
            expires_at: entry.expires_at_ms / 1000,
        }))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.sweeper.cancel();
        self.entries.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
