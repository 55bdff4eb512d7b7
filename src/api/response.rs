use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub environment: String,
}

impl HealthResponse {
    pub fn ok(environment: &str) -> Self {
        Self {
            status: "ok",
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
            environment: environment.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}
