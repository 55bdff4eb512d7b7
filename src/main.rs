use bracket_data_service::{
    api,
    cache,
    config::Config,
    service::TournamentService,
    state::AppState,
    upstream::UpstreamClient,
};

use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Helper function for shutdown signal handling
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bracket-data-service");

    // Load configuration; a missing upstream token is fatal.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Fatal configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded: {:?}", config);

    // Main shutdown token
    let shutdown = CancellationToken::new();

    // Initialize the cache stack (memory-only or [redis, memory] composite)
    let cache = cache::init_cache(&config).await;
    info!("Cache initialized: {}", cache.name());

    // Upstream client with its serialized request queue
    let upstream = UpstreamClient::new(&config, shutdown.clone());
    info!(
        "Upstream client initialized against {} ({}ms min interval, {} retries)",
        config.upstream_url,
        config.upstream_min_interval.as_millis(),
        config.upstream_max_retries
    );

    let service = TournamentService::new(cache.clone(), upstream, &config);

    // Create shared state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        service,
    });

    // Start HTTP server
    let app = api::create_router(app_state.clone());
    let addr = format!("{}:{}", config.server_host, config.listen_port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.cancelled().await;
            })
            .await
            .expect("Server error");
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    // Initiate shutdown
    info!("Initiating graceful shutdown sequence");
    shutdown.cancel();

    let shutdown_timeout = tokio::time::Duration::from_secs(10);
    tokio::select! {
        _ = tokio::time::sleep(shutdown_timeout) => {
            warn!("Server shutdown timed out after {:?}, forcing exit", shutdown_timeout);
        }
        _ = server_handle => {
            info!("HTTP server shut down successfully");
        }
    }

    // Stop the cache sweep and release remote connections.
    if let Err(e) = app_state.service.close().await {
        warn!("Cache close failed: {}", e);
    }

    info!("All components shut down, exiting");
    Ok(())
}
