use crate::{
    api::{
        error::ApiError,
        response::{ClearedResponse, HealthResponse},
    },
    models::{CacheStatusResponse, TournamentResponse},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// GET /api/tournament/:slug query parameters
#[derive(Deserialize)]
pub struct TournamentQuery {
    refresh: Option<String>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&app_state.config.allowed_origin);

    Router::new()
        .route("/health", get(health))
        .route("/api/tournament/:slug", get(get_tournament))
        .route("/api/tournament/:slug/refresh", post(refresh_tournament))
        .route("/api/tournament/:slug/cache-status", get(cache_status))
        .route("/api/cache/clear", post(clear_cache))
        .layer(cors)
        .with_state(app_state)
}

fn build_cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// GET /health handler
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(&state.config.environment))
}

// GET /api/tournament/:slug handler
async fn get_tournament(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<TournamentQuery>,
) -> Result<Json<TournamentResponse>, ApiError> {
    let refresh = params.refresh.as_deref() == Some("true");
    info!("Tournament request for slug: {}, refresh: {}", slug, refresh);

    let response = state.service.get(&slug, refresh).await?;
    Ok(Json(response))
}

// POST /api/tournament/:slug/refresh handler
async fn refresh_tournament(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<TournamentResponse>, ApiError> {
    info!("Forced refresh for slug: {}", slug);

    let response = state.service.refresh(&slug).await?;
    Ok(Json(response))
}

// GET /api/tournament/:slug/cache-status handler
async fn cache_status(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Json<CacheStatusResponse> {
    Json(state.service.status(&slug).await)
}

// POST /api/cache/clear handler
async fn clear_cache(State(state): State<Arc<AppState>>) -> Result<Json<ClearedResponse>, ApiError> {
    match state.service.clear_cache().await {
        Ok(()) => {
            info!("Cache cleared");
            Ok(Json(ClearedResponse { cleared: true }))
        }
        Err(e) => {
            warn!("Cache clear failed: {}", e);
            Err(ApiError::Internal(e.to_string()))
        }
    }
}
