//! Shared test fixtures: a scripted mock upstream served over loopback, a
//! fault-injecting cache backend, and config/domain builders.

use crate::cache::memory::MemoryCache;
use crate::cache::{CacheBackend, CacheError, CacheMetadata};
use crate::config::Config;
use crate::models::{Event, Match, MatchStatus, Tournament};
use crate::service::TournamentService;
use crate::state::AppState;
use crate::upstream::UpstreamClient;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub fn test_config(upstream_url: &str) -> Config {
    Config {
        upstream_token: "test-token".to_string(),
        upstream_url: upstream_url.to_string(),
        remote_cache_url: None,
        server_host: "127.0.0.1".to_string(),
        listen_port: 0,
        allowed_origin: "http://localhost:3000".to_string(),
        environment: "test".to_string(),
        upstream_min_interval: Duration::from_millis(10),
        upstream_max_retries: 3,
        upstream_retry_base: Duration::from_millis(20),
        page_size: 30,
        page_limit: 10,
        cache_sweep_interval: Duration::from_secs(300),
        cache_promotion: false,
    }
}

// ---------------------------------------------------------------------------
// Mock upstream
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockPhaseGroup {
    pub id: i64,
    pub identifier: &'static str,
    pub phase: Option<&'static str>,
    pub sets: Vec<Value>,
}

#[derive(Clone)]
pub struct MockEvent {
    pub id: i64,
    pub name: &'static str,
    pub entrants: Vec<(i64, &'static str)>,
    pub phase_groups: Vec<MockPhaseGroup>,
}

#[derive(Clone)]
pub struct MockScript {
    pub tournament_name: &'static str,
    pub events: Vec<MockEvent>,
    /// First N requests (of any kind) are answered with HTTP 429.
    pub rate_limited_first: usize,
    pub response_delay: Duration,
    /// Answer the tournament query with `tournament: null`.
    pub missing: bool,
    /// Phase-group lookups for these event ids are answered with HTTP 500.
    pub fail_event_ids: Vec<i64>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            tournament_name: "Demo Tournament",
            events: Vec::new(),
            rate_limited_first: 0,
            response_delay: Duration::ZERO,
            missing: false,
            fail_event_ids: Vec::new(),
        }
    }
}

/// One event, one phase group, sets built from the given wire-set values.
pub fn simple_script(sets: Vec<Value>) -> MockScript {
    MockScript {
        events: vec![MockEvent {
            id: 100,
            name: "Singles",
            entrants: vec![],
            phase_groups: vec![MockPhaseGroup {
                id: 500,
                identifier: "A",
                phase: Some("Bracket"),
                sets,
            }],
        }],
        ..MockScript::default()
    }
}

/// Wire-format set JSON as the upstream would return it.
pub fn wire_set(
    id: i64,
    state: i64,
    entrant1: (i64, &str),
    entrant2: (i64, &str),
    winner_id: Option<i64>,
    completed_at: Option<i64>,
) -> Value {
    let (id1, tag1) = entrant1;
    let (id2, tag2) = entrant2;
    json!({
        "id": id,
        "round": 1,
        "fullRoundText": "Winners Round 1",
        "state": state,
        "winnerId": winner_id,
        "startedAt": null,
        "completedAt": completed_at,
        "updatedAt": completed_at,
        "slots": [
            {
                "entrant": {
                    "id": id1,
                    "name": tag1,
                    "participants": [{"id": id1 * 10, "gamerTag": tag1}]
                },
                "standing": null
            },
            {
                "entrant": {
                    "id": id2,
                    "name": tag2,
                    "participants": [{"id": id2 * 10, "gamerTag": tag2}]
                },
                "standing": null
            }
        ],
        "games": null
    })
}

pub struct MockUpstream {
    pub url: String,
    pub total_hits: Arc<AtomicUsize>,
    pub tournament_hits: Arc<AtomicUsize>,
    pub set_page_hits: Arc<AtomicUsize>,
}

struct MockState {
    script: MockScript,
    total_hits: Arc<AtomicUsize>,
    tournament_hits: Arc<AtomicUsize>,
    set_page_hits: Arc<AtomicUsize>,
}

pub async fn spawn_mock(script: MockScript) -> MockUpstream {
    let total_hits = Arc::new(AtomicUsize::new(0));
    let tournament_hits = Arc::new(AtomicUsize::new(0));
    let set_page_hits = Arc::new(AtomicUsize::new(0));

    let state = Arc::new(MockState {
        script,
        total_hits: total_hits.clone(),
        tournament_hits: tournament_hits.clone(),
        set_page_hits: set_page_hits.clone(),
    });

    let app = Router::new().route("/", post(mock_handler)).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        url: format!("http://{}", addr),
        total_hits,
        tournament_hits,
        set_page_hits,
    }
}

async fn mock_handler(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let n = state.total_hits.fetch_add(1, Ordering::SeqCst);
    if n < state.script.rate_limited_first {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    if !state.script.response_delay.is_zero() {
        tokio::time::sleep(state.script.response_delay).await;
    }

    let query = body["query"].as_str().unwrap_or_default();
    let variables = &body["variables"];

    if query.contains("TournamentBySlug") {
        state.tournament_hits.fetch_add(1, Ordering::SeqCst);
        if state.script.missing {
            return Json(json!({"data": {"tournament": null}})).into_response();
        }
        let slug = variables["slug"].as_str().unwrap_or("demo");
        let events: Vec<Value> = state
            .script
            .events
            .iter()
            .map(|e| {
                let entrants: Vec<Value> = e
                    .entrants
                    .iter()
                    .map(|(id, tag)| {
                        json!({
                            "id": id,
                            "name": tag,
                            "participants": [{"id": id * 10, "gamerTag": tag}]
                        })
                    })
                    .collect();
                json!({
                    "id": e.id,
                    "name": e.name,
                    "slug": format!("event/{}", e.name.to_lowercase()),
                    "entrants": {"nodes": entrants}
                })
            })
            .collect();
        return Json(json!({
            "data": {
                "tournament": {
                    "id": 42,
                    "name": state.script.tournament_name,
                    "slug": slug,
                    "url": format!("https://upstream.example/{}", slug),
                    "events": events
                }
            }
        }))
        .into_response();
    }

    if query.contains("EventPhaseGroups") {
        // GraphQL IDs travel as strings; accept numbers too.
        let event_id = variables["eventId"]
            .as_i64()
            .or_else(|| variables["eventId"].as_str().and_then(|s| s.parse().ok()))
            .unwrap_or(0);
        if state.script.fail_event_ids.contains(&event_id) {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        let groups: Vec<Value> = state
            .script
            .events
            .iter()
            .filter(|e| e.id == event_id)
            .flat_map(|e| e.phase_groups.iter())
            .map(|g| {
                json!({
                    "id": g.id,
                    "displayIdentifier": g.identifier,
                    "phase": g.phase.map(|name| json!({"name": name}))
                })
            })
            .collect();
        return Json(json!({
            "data": {"event": {"id": event_id, "phaseGroups": groups}}
        }))
        .into_response();
    }

    if query.contains("PhaseGroupSets") {
        state.set_page_hits.fetch_add(1, Ordering::SeqCst);
        let group_id = variables["phaseGroupId"].as_i64().unwrap_or(0);
        let page = variables["page"].as_u64().unwrap_or(1) as usize;
        let per_page = variables["perPage"].as_u64().unwrap_or(30) as usize;
        let sets = state
            .script
            .events
            .iter()
            .flat_map(|e| e.phase_groups.iter())
            .find(|g| g.id == group_id)
            .map(|g| {
                let start = (page - 1) * per_page;
                let end = (start + per_page).min(g.sets.len());
                if start >= g.sets.len() {
                    Vec::new()
                } else {
                    g.sets[start..end].to_vec()
                }
            })
            .unwrap_or_default();
        return Json(json!({
            "data": {"phaseGroup": {"id": group_id, "sets": {"nodes": sets}}}
        }))
        .into_response();
    }

    Json(json!({"data": null})).into_response()
}

// ---------------------------------------------------------------------------
// Fault-injecting cache backend
// ---------------------------------------------------------------------------

pub struct FaultyBackend {
    inner: MemoryCache,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FaultyBackend {
    pub fn new(fail_reads: bool, fail_writes: bool) -> Self {
        Self {
            inner: MemoryCache::new(Duration::from_secs(300)),
            fail_reads: AtomicBool::new(fail_reads),
            fail_writes: AtomicBool::new(fail_writes),
        }
    }

    fn read_fault(&self) -> Result<(), CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(CacheError::Remote("injected read fault".to_string()))
        } else {
            Ok(())
        }
    }

    fn write_fault(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CacheError::Remote("injected write fault".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for FaultyBackend {
    async fn get(&self, key: &str) -> Result<Option<Tournament>, CacheError> {
        self.read_fault()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Tournament, ttl: Duration) -> Result<(), CacheError> {
        self.write_fault()?;
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.write_fault()?;
        self.inner.del(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.read_fault()?;
        self.inner.exists(key).await
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>, CacheError> {
        self.read_fault()?;
        self.inner.metadata(key).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.write_fault()?;
        self.inner.clear().await
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.write_fault()?;
        self.inner.close().await
    }

    fn name(&self) -> String {
        "faulty".to_string()
    }
}

// ---------------------------------------------------------------------------
// Service and app builders
// ---------------------------------------------------------------------------

pub async fn test_service(script: MockScript) -> (TournamentService, MockUpstream, Config) {
    let mock = spawn_mock(script).await;
    let config = test_config(&mock.url);
    let cache = Arc::new(MemoryCache::new(Duration::from_secs(300)));
    let service = service_with_cache(cache, &config);
    (service, mock, config)
}

pub fn service_with_cache(cache: Arc<dyn CacheBackend>, config: &Config) -> TournamentService {
    let upstream = UpstreamClient::new(config, CancellationToken::new());
    TournamentService::new(cache, upstream, config)
}

/// Serve the real router on an ephemeral port, returning its base URL.
pub async fn spawn_app(service: TournamentService, config: Config) -> String {
    let state = Arc::new(AppState { config, service });
    let app = crate::api::create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ---------------------------------------------------------------------------
// Domain fixtures
// ---------------------------------------------------------------------------

pub fn tournament_fixture(name: &str) -> Tournament {
    Tournament {
        id: "42".to_string(),
        name: name.to_string(),
        slug: "demo".to_string(),
        url: None,
        events: vec![Event {
            id: "100".to_string(),
            name: "Singles".to_string(),
            slug: None,
            brackets: Vec::new(),
            participants: Vec::new(),
            current_matches: Vec::new(),
        }],
    }
}

pub fn current_match(id: &str, status: MatchStatus, completed_at: Option<i64>) -> Match {
    Match {
        id: id.to_string(),
        round: "Round 1".to_string(),
        player1: None,
        player2: None,
        winner: None,
        status,
        bracket_name: "Bracket - A".to_string(),
        score: None,
        started_at: None,
        completed_at,
        updated_at: completed_at,
    }
}
