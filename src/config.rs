// Configuration structure for:
// - Upstream GraphQL endpoint and bearer token
// - Optional remote cache (Redis) URL
// - Server listening address/port and CORS origin
// - Upstream rate/retry budget and pagination sizing
// - Cache sweep/promotion settings

use dotenv::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("UPSTREAM_TOKEN is not set; a bearer credential is required to reach the upstream API")]
    MissingToken,
}

#[derive(Clone)]
pub struct Config {
    pub upstream_token: String,
    pub upstream_url: String,
    pub remote_cache_url: Option<String>,
    pub server_host: String,
    pub listen_port: u16,
    pub allowed_origin: String,
    pub environment: String,
    pub upstream_min_interval: Duration,
    pub upstream_max_retries: usize,
    pub upstream_retry_base: Duration,
    pub page_size: usize,
    pub page_limit: usize,
    pub cache_sweep_interval: Duration,
    pub cache_promotion: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let upstream_token = env::var("UPSTREAM_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let upstream_url = env::var("UPSTREAM_URL")
            .unwrap_or_else(|_| "https://api.start.gg/gql/alpha".to_string());
        let remote_cache_url = env::var("REMOTE_CACHE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let listen_port = env::var("LISTEN_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .unwrap_or(3001);
        let allowed_origin = env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let upstream_min_interval = env::var("UPSTREAM_MIN_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(800));
        let upstream_max_retries = env::var("UPSTREAM_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let upstream_retry_base = env::var("UPSTREAM_RETRY_BASE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(2000));
        let page_size = env::var("PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let page_limit = env::var("PAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let cache_sweep_interval = env::var("CACHE_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));
        let cache_promotion = env::var("CACHE_PROMOTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            upstream_token,
            upstream_url,
            remote_cache_url,
            server_host,
            listen_port,
            allowed_origin,
            environment,
            upstream_min_interval,
            upstream_max_retries,
            upstream_retry_base,
            page_size,
            page_limit,
            cache_sweep_interval,
            cache_promotion,
        })
    }
}

// The bearer token must never reach logs, so Debug renders it redacted.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("upstream_token", &"[redacted]")
            .field("upstream_url", &self.upstream_url)
            .field("remote_cache_url", &self.remote_cache_url)
            .field("server_host", &self.server_host)
            .field("listen_port", &self.listen_port)
            .field("allowed_origin", &self.allowed_origin)
            .field("environment", &self.environment)
            .field("upstream_min_interval", &self.upstream_min_interval)
            .field("upstream_max_retries", &self.upstream_max_retries)
            .field("upstream_retry_base", &self.upstream_retry_base)
            .field("page_size", &self.page_size)
            .field("page_limit", &self.page_limit)
            .field("cache_sweep_interval", &self.cache_sweep_interval)
            .field("cache_promotion", &self.cache_promotion)
            .finish()
    }
}
