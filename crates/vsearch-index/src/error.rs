//! Engine error types.

use thiserror::Error;

use vsearch_embed::EmbedError;
use vsearch_media::MediaError;

use crate::index::IndexError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by index build, query and persistence.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Video source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("No index available: build or load an index first")]
    IndexUnavailable,

    #[error("Persisted index is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Embedding model mismatch: index built with {indexed}, provider serves {provider}")]
    ModelMismatch { indexed: String, provider: String },

    #[error("Frame not found: {0}")]
    FrameNotFound(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn persistence_corrupt(msg: impl Into<String>) -> Self {
        Self::PersistenceCorrupt(msg.into())
    }

    pub fn provider_failure(msg: impl Into<String>) -> Self {
        Self::ProviderFailure(msg.into())
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidParameter(_) => "invalid_parameter",
            EngineError::SourceUnreadable(_) => "source_unreadable",
            EngineError::IndexUnavailable => "index_unavailable",
            EngineError::PersistenceCorrupt(_) => "persistence_corrupt",
            EngineError::ProviderFailure(_) => "provider_failure",
            EngineError::ModelMismatch { .. } => "model_mismatch",
            EngineError::FrameNotFound(_) => "frame_not_found",
            EngineError::Io(_) => "io",
        }
    }
}

impl From<MediaError> for EngineError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::InvalidParameter(msg) => EngineError::InvalidParameter(msg),
            MediaError::FrameNotFound(index) => EngineError::FrameNotFound(index),
            MediaError::Io(e) => EngineError::Io(e),
            e if e.is_source_error() => EngineError::SourceUnreadable(e.to_string()),
            // missing binaries and timeouts are backend failures, not bad input
            e => EngineError::ProviderFailure(e.to_string()),
        }
    }
}

impl From<EmbedError> for EngineError {
    fn from(e: EmbedError) -> Self {
        EngineError::ProviderFailure(e.to_string())
    }
}

impl From<IndexError> for EngineError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Corrupt(msg) => EngineError::PersistenceCorrupt(msg),
            e => EngineError::ProviderFailure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_media_error_mapping() {
        let err: EngineError = MediaError::invalid_parameter("fps").into();
        assert!(matches!(err, EngineError::InvalidParameter(_)));

        let err: EngineError = MediaError::FileNotFound(PathBuf::from("a.mp4")).into();
        assert!(matches!(err, EngineError::SourceUnreadable(_)));

        let err: EngineError = MediaError::invalid_video("no stream").into();
        assert!(matches!(err, EngineError::SourceUnreadable(_)));

        let err: EngineError = MediaError::FrameNotFound(4).into();
        assert!(matches!(err, EngineError::FrameNotFound(4)));

        let err: EngineError = MediaError::FfmpegNotFound.into();
        assert!(matches!(err, EngineError::ProviderFailure(_)));

        let err: EngineError = MediaError::Io(std::io::Error::other("disk full")).into();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_index_error_mapping() {
        let err: EngineError = IndexError::Corrupt("bad magic".into()).into();
        assert!(matches!(err, EngineError::PersistenceCorrupt(_)));

        let err: EngineError = IndexError::DimensionMismatch {
            expected: 512,
            actual: 3,
        }
        .into();
        assert!(matches!(err, EngineError::ProviderFailure(_)));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EngineError::IndexUnavailable.kind(), "index_unavailable");
        assert_eq!(EngineError::persistence_corrupt("x").kind(), "persistence_corrupt");
    }
}
