// Cache+fetch orchestration behind the router. Concurrent misses for one
// tournament coalesce onto a single upstream fetch; the fetch itself runs
// as a detached task so a caller that gives up never aborts the work the
// cache and the other waiters are counting on.

use crate::cache::{keys, ttl, CacheBackend, CacheError};
use crate::config::Config;
use crate::models::{CacheStatusResponse, ResponseMetadata, TournamentResponse};
use crate::upstream::client::{ClientError, UpstreamClient};
use crate::upstream::loader::{load_tournament, FetchOptions, LoadHooks};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

type FlightResult = Result<TournamentResponse, ClientError>;

/// Shared handle for one in-flight upstream fetch. Waiters watch for the
/// result; the leader task publishes it exactly once.
struct Flight {
    receiver: watch::Receiver<Option<FlightResult>>,
}

#[derive(Clone)]
pub struct TournamentService {
    cache: Arc<dyn CacheBackend>,
    upstream: UpstreamClient,
    options: FetchOptions,
    hooks: LoadHooks,
    flights: Arc<Mutex<HashMap<String, Arc<Flight>>>>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl TournamentService {
    pub fn new(cache: Arc<dyn CacheBackend>, upstream: UpstreamClient, config: &Config) -> Self {
        info!("Tournament service using cache: {}", cache.name());
        Self {
            cache,
            upstream,
            options: FetchOptions::from_config(config),
            hooks: LoadHooks::default(),
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_hooks(mut self, hooks: LoadHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Cache-aware read. With `refresh` the cache lookup is skipped and a
    /// fresh fetch always runs.
    pub async fn get(&self, slug: &str, refresh: bool) -> Result<TournamentResponse, ClientError> {
        let key = keys::tournament_key(slug);
        if !refresh {
            if let Some(response) = self.read_cached(&key).await {
                return Ok(response);
            }
        }
        self.fetch_shared(key, slug.to_string(), refresh).await
    }

    /// Forced refresh: drop the cache entry, then fetch and write through.
    pub async fn refresh(&self, slug: &str) -> Result<TournamentResponse, ClientError> {
        let key = keys::tournament_key(slug);
        if let Err(e) = self.cache.del(&key).await {
            warn!("Cache delete failed for {}: {}", key, e);
        }
        self.fetch_shared(key, slug.to_string(), true).await
    }

    /// Cache metadata only; upstream is never touched.
    pub async fn status(&self, slug: &str) -> CacheStatusResponse {
        let key = keys::tournament_key(slug);
        match self.cache.metadata(&key).await {
            Ok(metadata) => CacheStatusResponse {
                cached: metadata.is_some(),
                metadata,
            },
            Err(e) => {
                warn!("Cache metadata lookup failed for {}: {}", key, e);
                CacheStatusResponse {
                    cached: false,
                    metadata: None,
                }
            }
        }
    }

    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear().await
    }

    pub async fn close(&self) -> Result<(), CacheError> {
        self.cache.close().await
    }

    async fn read_cached(&self, key: &str) -> Option<TournamentResponse> {
        match self.cache.get(key).await {
            Ok(Some(tournament)) => {
                let metadata = match self.cache.metadata(key).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!("Cache metadata lookup failed for {}: {}", key, e);
                        None
                    }
                };
                let activity = ttl::summarize_activity(&tournament);
                Some(TournamentResponse {
                    data: tournament,
                    cached: true,
                    metadata: ResponseMetadata {
                        cached_at: metadata.as_ref().map(|m| m.created_at),
                        ttl: metadata.as_ref().map(|m| m.ttl),
                        has_ongoing_matches: activity.has_ongoing_matches,
                        has_recent_matches: activity.has_recent_matches,
                        counts: activity.counts,
                    },
                })
            }
            Ok(None) => None,
            Err(e) => {
                // Cache faults never fail the request; fall through to a
                // fresh fetch.
                warn!("Cache read failed for {}, fetching upstream: {}", key, e);
                None
            }
        }
    }

    async fn fetch_shared(
        &self,
        key: String,
        slug: String,
        refresh: bool,
    ) -> Result<TournamentResponse, ClientError> {
        let flight = {
            let mut flights = self.flights.lock().await;
            match flights.get(&key) {
                // Plain reads coalesce onto whatever fetch is running.
                Some(existing) if !refresh => existing.clone(),
                // A forced refresh starts its own fetch and replaces the
                // entry, so later reads observe the fresher result.
                _ => {
                    let (sender, receiver) = watch::channel(None);
                    let flight = Arc::new(Flight { receiver });
                    flights.insert(key.clone(), flight.clone());
                    self.spawn_fetch(key.clone(), slug, flight.clone(), sender);
                    flight
                }
            }
        };

        let mut receiver = flight.receiver.clone();
        loop {
            if let Some(result) = receiver.borrow().clone() {
                return result;
            }
            if receiver.changed().await.is_err() {
                return Err(ClientError::Unavailable(
                    "tournament fetch aborted".to_string(),
                ));
            }
        }
    }

    fn spawn_fetch(
        &self,
        key: String,
        slug: String,
        flight: Arc<Flight>,
        sender: watch::Sender<Option<FlightResult>>,
    ) {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.fetch_and_store(&key, &slug).await;
            {
                let mut flights = service.flights.lock().await;
                if let Some(current) = flights.get(&key) {
                    if Arc::ptr_eq(current, &flight) {
                        flights.remove(&key);
                    }
                }
            }
            let _ = sender.send(Some(result));
        });
    }

    async fn fetch_and_store(&self, key: &str, slug: &str) -> FlightResult {
        let tournament = load_tournament(&self.upstream, slug, &self.options, &self.hooks).await?;
        let activity = ttl::summarize_activity(&tournament);
        let ttl = ttl::ttl_for_activity(&activity);

        match self.cache.set(key, &tournament, ttl).await {
            Ok(()) => debug!("Cached {} with TTL {:?}", key, ttl),
            Err(e) => warn!("Cache write failed for {}, serving fresh uncached: {}", key, e),
        }

        Ok(TournamentResponse {
            data: tournament,
            cached: false,
            metadata: ResponseMetadata {
                cached_at: Some(now_secs()),
                ttl: Some(ttl.as_secs() as i64),
                has_ongoing_matches: activity.has_ongoing_matches,
                has_recent_matches: activity.has_recent_matches,
                counts: activity.counts,
            },
        })
    }
}
