// Manual integration check for the HTTP surface: starts the service on a
// local port and walks the endpoints with a real client.
// Requires UPSTREAM_TOKEN; pass a tournament slug as the first argument.

use bracket_data_service::{
    api, cache, config::Config, service::TournamentService, state::AppState,
    upstream::UpstreamClient,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting API integration checks...");

    let slug = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "genesis-9-1".to_string());

    let config = Config::from_env()?;
    let shutdown = CancellationToken::new();

    let cache = cache::init_cache(&config).await;
    let upstream = UpstreamClient::new(&config, shutdown.clone());
    let service = TournamentService::new(cache, upstream, &config);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        service,
    });

    let port = 3333; // Use a different port than the main app
    let server_addr = format!("127.0.0.1:{}", port);
    info!("Starting test server on {}", server_addr);

    let app = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&server_addr).await?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server time to start
    sleep(Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let base_url = format!("http://{}", server_addr);

    info!("\n===== /health =====");
    let health: Value = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    info!("health: {}", health);

    info!("\n===== cold read =====");
    let cold: Value = client
        .get(format!("{}/api/tournament/{}", base_url, slug))
        .send()
        .await?
        .json()
        .await?;
    info!(
        "cached: {}, ttl: {}, events: {}",
        cold["cached"],
        cold["metadata"]["ttl"],
        cold["data"]["events"].as_array().map(|e| e.len()).unwrap_or(0)
    );

    info!("\n===== warm read =====");
    let warm: Value = client
        .get(format!("{}/api/tournament/{}", base_url, slug))
        .send()
        .await?
        .json()
        .await?;
    info!("cached: {}, ttl: {}", warm["cached"], warm["metadata"]["ttl"]);

    info!("\n===== cache-status =====");
    let status: Value = client
        .get(format!("{}/api/tournament/{}/cache-status", base_url, slug))
        .send()
        .await?
        .json()
        .await?;
    info!("cache-status: {}", status);

    info!("\n===== forced refresh =====");
    let refreshed: Value = client
        .post(format!("{}/api/tournament/{}/refresh", base_url, slug))
        .send()
        .await?
        .json()
        .await?;
    info!(
        "cached: {}, ttl: {}, ongoing: {}",
        refreshed["cached"],
        refreshed["metadata"]["ttl"],
        refreshed["metadata"]["counts"]["ongoing"]
    );

    info!("All checks completed");
    Ok(())
}
