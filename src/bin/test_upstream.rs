// Manual integration check against the live upstream API.
// Requires UPSTREAM_TOKEN; pass a tournament slug as the first argument.

use bracket_data_service::config::Config;
use bracket_data_service::upstream::loader::{load_tournament, FetchOptions, LoadHooks};
use bracket_data_service::upstream::UpstreamClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let slug = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "genesis-9-1".to_string());

    info!("Fetching tournament '{}' from the live upstream...", slug);

    let config = Config::from_env()?;
    let client = UpstreamClient::new(&config, CancellationToken::new());

    let hooks = LoadHooks {
        on_progress: Some(Arc::new(|message: &str| {
            info!("{}", message);
        })),
        on_bracket_complete: Some(Arc::new(
            |event: &str, bracket: &bracket_data_service::models::Bracket| {
                info!(
                    "  {} / {} loaded with {} matches",
                    event,
                    bracket.name,
                    bracket.matches.len()
                );
            },
        )),
    };

    let tournament = load_tournament(&client, &slug, &FetchOptions::from_config(&config), &hooks).await?;

    info!("Tournament: {} ({})", tournament.name, tournament.slug);
    for event in &tournament.events {
        info!(
            "  Event '{}': {} brackets, {} participants, {} current matches",
            event.name,
            event.brackets.len(),
            event.participants.len(),
            event.current_matches.len()
        );
    }

    Ok(())
}
