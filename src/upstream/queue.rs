// Serialized upstream dispatch. Every outbound GraphQL call funnels through
// one worker task draining a bounded channel, so at most one request is in
// flight and the pacing state has a single writer by construction.

use crate::config::Config;
use crate::upstream::client::ClientError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const QUEUE_DEPTH: usize = 256;

pub struct QueuedRequest {
    pub query: &'static str,
    pub variables: Value,
    pub reply: oneshot::Sender<Result<Value, ClientError>>,
}

#[derive(Clone)]
pub struct RequestQueue {
    sender: mpsc::Sender<QueuedRequest>,
}

impl RequestQueue {
    pub fn start(config: &Config, shutdown: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);

        let worker = QueueWorker::new(config);
        tokio::spawn(async move {
            worker.run(receiver, shutdown).await;
        });

        Self { sender }
    }

    /// Enqueue one GraphQL call and wait for its reply. Dropping the
    /// returned future before dispatch discards the queued request.
    pub async fn dispatch(&self, query: &'static str, variables: Value) -> Result<Value, ClientError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(QueuedRequest { query, variables, reply })
            .await
            .map_err(|_| ClientError::Network("upstream request queue is closed".to_string()))?;
        response
            .await
            .map_err(|_| ClientError::Network("upstream request was dropped before completion".to_string()))?
    }
}

struct QueueWorker {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl QueueWorker {
    fn new(config: &Config) -> Self {
        // A zero interval degenerates to effectively-unpaced dispatch.
        let quota = Quota::with_period(config.upstream_min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1000).unwrap()));

        Self {
            http: reqwest::Client::new(),
            endpoint: config.upstream_url.clone(),
            token: config.upstream_token.clone(),
            limiter: RateLimiter::direct(quota),
        }
    }

    async fn run(self, mut receiver: mpsc::Receiver<QueuedRequest>, shutdown: CancellationToken) {
        info!("Upstream queue worker started");

        loop {
            let request = tokio::select! {
                _ = shutdown.cancelled() => break,
                request = receiver.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            // The caller gave up while this request sat in the queue; skip
            // the dispatch so the rate budget is not spent on it.
            if request.reply.is_closed() {
                debug!("Discarding queued upstream request, caller went away");
                continue;
            }

            self.limiter.until_ready().await;
            let result = self.execute(request.query, &request.variables).await;
            let _ = request.reply.send(result);
        }

        info!("Upstream queue worker shutting down");
    }

    async fn execute(&self, query: &'static str, variables: &Value) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::AuthFailed);
        }
        if !status.is_success() {
            return Err(ClientError::Unavailable(format!(
                "upstream returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
            if let Some(first) = errors.first() {
                let message = first
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown GraphQL error");
                warn!("Upstream GraphQL error: {}", message);
                return Err(ClientError::Unavailable(message.to_string()));
            }
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}
