use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::quota::QuotaExceeded;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    QuotaExceeded(#[from] QuotaExceeded),
    #[error("Invalid image file: {0}")]
    InvalidImage(#[from] crate::imaging::ImageError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("No healthy {0} backends available")]
    NoHealthyBackend(&'static str),
    #[error("Backend {url} failed: {source}")]
    Backend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Backend {url} returned an unusable response: {reason}")]
    BackendResponse { url: String, reason: String },
    #[error("Chat API error: {0}")]
    Chat(String),
    #[error("Failed to queue request")]
    QueueClosed,
    #[error("Worker failed to respond")]
    WorkerDropped,
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to build HTTP client - {0}")]
    HttpClient(reqwest::Error),
    #[error("Failed to encode metrics - {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::InvalidImage(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NoHealthyBackend(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Backend { .. } | Error::BackendResponse { .. } | Error::Chat(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::QueueClosed
            | Error::WorkerDropped
            | Error::Task(_)
            | Error::Config(_)
            | Error::HttpClient(_)
            | Error::Metrics(_)
            | Error::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Error::QuotaExceeded(_) => "quota_exceeded",
            Error::InvalidImage(_) => "invalid_image",
            Error::BadRequest(_) => "bad_request",
            Error::NoHealthyBackend(_) => "backend_unavailable",
            Error::Backend { .. } | Error::BackendResponse { .. } | Error::Chat(_) => {
                "backend_error"
            }
            _ => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::warn!("{self}");
        }

        let message = match &self {
            Error::QuotaExceeded(e) => format!(
                "Analysis limit reached ({} per {} seconds). Please wait {} seconds before trying again.",
                e.max_calls,
                e.window.as_secs(),
                e.retry_after_secs()
            ),
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }));
        let mut res = (status, body).into_response();

        if let Error::QuotaExceeded(e) = &self {
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(e.retry_after_secs()));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn quota_error_maps_to_429_with_retry_after() {
        let err = Error::from(QuotaExceeded {
            session_id: "s".into(),
            max_calls: 1,
            window: Duration::from_secs(3600),
            retry_after: Duration::from_secs(42),
        });
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        // rounded past the window end
        assert_eq!(res.headers()[header::RETRY_AFTER], "43");
    }

    #[test]
    fn backend_unavailable_is_503() {
        assert_eq!(
            Error::NoHealthyBackend("vision").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
