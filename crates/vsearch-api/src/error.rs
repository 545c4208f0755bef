//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vsearch_index::EngineError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Detail returned when a search arrives before any video was indexed.
pub const NO_INDEX_DETAIL: &str = "No video indexed. Upload and index a video first.";

/// Detail shown in place of server error messages in production.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Index built with {frames} frames and serving queries, but saving it failed: {source}")]
    NotPersisted {
        frames: usize,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::InvalidParameter(_) | EngineError::IndexUnavailable => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::SourceUnreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::FrameNotFound(_) => StatusCode::NOT_FOUND,
                EngineError::PersistenceCorrupt(_)
                | EngineError::ProviderFailure(_)
                | EngineError::ModelMismatch { .. }
                | EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotPersisted { .. } | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code, when one applies.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Engine(e) => Some(e.kind()),
            ApiError::NotPersisted { .. } => Some("index_not_persisted"),
            _ => None,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Engine(EngineError::IndexUnavailable) => NO_INDEX_DETAIL.to_string(),
            ApiError::Engine(EngineError::FrameNotFound(_)) => "Frame not found".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

/// Error code carried on error responses for [`redact_server_error`].
#[derive(Debug, Clone, Copy)]
struct ErrorCode(Option<&'static str>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let code = self.code();
        let mut response = (
            status,
            Json(ErrorResponse {
                detail: self.detail(),
                code,
            }),
        )
            .into_response();
        response.extensions_mut().insert(ErrorCode(code));
        response
    }
}

/// Replace the body of a server error with [`INTERNAL_ERROR_DETAIL`],
/// keeping its status and error code. Other responses pass through.
pub fn redact_server_error(response: Response) -> Response {
    let status = response.status();
    if !status.is_server_error() {
        return response;
    }

    let code = response.extensions().get::<ErrorCode>().and_then(|c| c.0);
    let mut redacted = (
        status,
        Json(ErrorResponse {
            detail: INTERNAL_ERROR_DETAIL.to_string(),
            code,
        }),
    )
        .into_response();
    redacted.extensions_mut().insert(ErrorCode(code));
    redacted
}
