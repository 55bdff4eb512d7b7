// Entry point for upstream GraphQL calls: classify failures, and retry
// rate-limited requests with exponential backoff while everything else
// surfaces to the caller untouched.

use crate::config::Config;
use crate::upstream::queue::RequestQueue;
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("tournament not found: {0}")]
    NotFound(String),

    #[error("upstream rate limit exceeded")]
    RateLimited,

    #[error("upstream authentication failed, check the configured token")]
    AuthFailed,

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected upstream response: {0}")]
    Parse(String),
}

#[derive(Clone)]
pub struct UpstreamClient {
    queue: RequestQueue,
    retry_base: Duration,
    max_retries: usize,
}

impl UpstreamClient {
    pub fn new(config: &Config, shutdown: CancellationToken) -> Self {
        Self {
            queue: RequestQueue::start(config, shutdown),
            retry_base: config.upstream_retry_base,
            max_retries: config.upstream_max_retries,
        }
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_base)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }

    /// One logical GraphQL request. Only "too many requests" is retried;
    /// after the retry budget it surfaces as the rate-limit failure.
    pub async fn request(&self, query: &'static str, variables: Value) -> Result<Value, ClientError> {
        (|| {
            let variables = variables.clone();
            async move { self.queue.dispatch(query, variables).await }
        })
        .retry(&self.retry_policy())
        .when(|e| {
            let limited = matches!(e, ClientError::RateLimited);
            if limited {
                warn!("Upstream rate limited, backing off before retrying");
            }
            limited
        })
        .await
    }
}
