use crate::upstream::client::ClientError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Tournament not found: {0}")]
    NotFound(String),

    #[error("Upstream rate limit exceeded, try again shortly")]
    RateLimited,

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream credentials are missing or invalid")]
    Misconfigured,

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::RateLimited => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Misconfigured => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            // Unexpected failures stay redacted; details go to the log only.
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "source": "backend",
        }));

        (status, body).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(msg) => ApiError::NotFound(msg),
            ClientError::RateLimited => ApiError::RateLimited,
            ClientError::AuthFailed => ApiError::Misconfigured,
            ClientError::Unavailable(msg) => ApiError::Unavailable(msg),
            ClientError::Network(msg) => ApiError::Unavailable(msg),
            ClientError::Parse(msg) => ApiError::Internal(msg),
        }
    }
}
