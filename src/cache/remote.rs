// Redis-backed cache backend. Values travel as a self-describing JSON
// envelope so metadata survives the round-trip; expiry is delegated to the
// server via SETEX-style writes and read back with TTL.
//
// Connection state is tracked explicitly: operations issued while
// disconnected fail fast instead of blocking, and the first failed command
// kicks off a bounded background reconnect.

use crate::cache::{CacheBackend, CacheError, CacheMetadata};
use crate::models::Tournament;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const CONNECT_ATTEMPTS: usize = 3;
const CONNECT_BACKOFF_CAP: Duration = Duration::from_secs(2);

#[derive(Serialize, Deserialize)]
struct Envelope {
    value: Tournament,
    created_at: i64,
}

struct Shared {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    connected: AtomicBool,
    reconnecting: AtomicBool,
}

pub struct RemoteCache {
    shared: Arc<Shared>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Shared {
    /// Up to CONNECT_ATTEMPTS tries with exponential backoff capped at
    /// CONNECT_BACKOFF_CAP per wait.
    async fn try_connect(&self) -> bool {
        for attempt in 0..CONNECT_ATTEMPTS {
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    *self.conn.lock().await = Some(conn);
                    self.connected.store(true, Ordering::Release);
                    return true;
                }
                Err(e) => {
                    warn!("Redis connect attempt {} failed: {}", attempt + 1, e);
                    if attempt + 1 < CONNECT_ATTEMPTS {
                        let backoff = Duration::from_millis(250 * (1 << attempt));
                        sleep(backoff.min(CONNECT_BACKOFF_CAP)).await;
                    }
                }
            }
        }
        self.connected.store(false, Ordering::Release);
        false
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(CacheError::Disconnected);
        }
        self.conn
            .lock()
            .await
            .clone()
            .ok_or(CacheError::Disconnected)
    }

    /// Mark the connection dead and reconnect in the background so callers
    /// keep failing fast instead of queueing behind a connect.
    fn mark_disconnected(self: &Arc<Self>) {
        self.connected.store(false, Ordering::Release);
        if self.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }
        let shared = self.clone();
        tokio::spawn(async move {
            if shared.try_connect().await {
                info!("Redis reconnected");
            }
            shared.reconnecting.store(false, Ordering::Release);
        });
    }
}

impl RemoteCache {
    /// Fails only on an unusable URL; an unreachable server yields a
    /// disconnected backend whose operations fail fast until it recovers.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Remote(e.to_string()))?;
        let shared = Arc::new(Shared {
            client,
            conn: Mutex::new(None),
            connected: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
        });
        shared.try_connect().await;
        Ok(Self { shared })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    fn remote_err(&self, e: redis::RedisError) -> CacheError {
        self.shared.mark_disconnected();
        CacheError::Remote(e.to_string())
    }
}

#[async_trait]
impl CacheBackend for RemoteCache {
    async fn get(&self, key: &str) -> Result<Option<Tournament>, CacheError> {
        let mut conn = self.shared.connection().await?;
        let blob: Option<Vec<u8>> = conn.get(key).await.map_err(|e| self.remote_err(e))?;
        match blob {
            Some(bytes) => {
                let envelope: Envelope = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(envelope.value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Tournament, ttl: Duration) -> Result<(), CacheError> {
        if ttl.as_secs() == 0 {
            return Err(CacheError::InvalidTtl);
        }
        let mut conn = self.shared.connection().await?;
        let envelope = Envelope {
            value: value.clone(),
            created_at: now_secs(),
        };
        let blob =
            serde_json::to_vec(&envelope).map_err(|e| CacheError::Serialization(e.to_string()))?;
        conn.set_ex::<_, _, ()>(key, blob, ttl.as_secs())
            .await
            .map_err(|e| self.remote_err(e))?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.shared.connection().await?;
        let _: i64 = conn.del(key).await.map_err(|e| self.remote_err(e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.shared.connection().await?;
        conn.exists(key).await.map_err(|e| self.remote_err(e))
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, CacheError> {
        let mut conn = self.shared.connection().await?;
        // TTL returns -2 for a missing key and -1 for one with no expiry.
        let remaining: i64 = redis::cmd("TTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.remote_err(e))?;
        if remaining < 0 {
            return Ok(None);
        }
        let blob: Option<Vec<u8>> = conn.get(key).await.map_err(|e| self.remote_err(e))?;
        let Some(bytes) = blob else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let now = now_secs();
        Ok(Some(CacheMetadata {
            key: key.to_string(),
            ttl: remaining,
            created_at: envelope.created_at,
            expires_at: now + remaining,
        }))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.shared.connection().await?;
        let pattern = crate::cache::keys::namespace_pattern();
        let mut cursor: u64 = 0;
        let mut removed: i64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| self.remote_err(e))?;
            if !keys.is_empty() {
                let deleted: i64 = conn.del(&keys).await.map_err(|e| self.remote_err(e))?;
                removed += deleted;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        debug!("Cleared {} remote cache entries", removed);
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.shared.connected.store(false, Ordering::Release);
        *self.shared.conn.lock().await = None;
        Ok(())
    }

    fn name(&self) -> String {
        "redis".to_string()
    }
}
