pub mod client;
pub mod loader;
pub mod queue;
pub mod wire;

pub use client::{ClientError, UpstreamClient};
pub use loader::{load_tournament, FetchOptions, LoadHooks};
