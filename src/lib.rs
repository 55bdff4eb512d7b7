pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod service;
pub mod state;
pub mod upstream;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience if desired
pub use api::error::ApiError;
pub use api::route::create_router;
pub use cache::{CacheBackend, CacheError, CacheMetadata};
pub use config::Config;
pub use models::{Tournament, TournamentResponse};
pub use service::TournamentService;
pub use upstream::client::{ClientError, UpstreamClient};
