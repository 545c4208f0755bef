//! Embedding client error types.

use std::path::PathBuf;
use thiserror::Error;

pub type EmbedResult<T> = Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model mismatch: expected {expected}, service returned {actual}")]
    ModelMismatch { expected: String, actual: String },

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EmbedError {
    /// Classify an unsuccessful HTTP status.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 | 500..=599 => {
                Self::ServiceUnavailable(format!("service returned {}: {}", status, body))
            }
            _ => Self::RequestFailed(format!("service returned {}: {}", status, body)),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedError::ServiceUnavailable(_) => true,
            EmbedError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            EmbedError::from_http_status(503, "loading model"),
            EmbedError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            EmbedError::from_http_status(429, "slow down"),
            EmbedError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            EmbedError::from_http_status(422, "bad image"),
            EmbedError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(EmbedError::from_http_status(502, "").is_retryable());
        assert!(!EmbedError::from_http_status(400, "").is_retryable());
        assert!(!EmbedError::invalid_response("short").is_retryable());
        assert!(!EmbedError::ModelMismatch {
            expected: "a".into(),
            actual: "b".into()
        }
        .is_retryable());
    }
}
