//! Search request and result models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::frame::FrameRecord;

/// Default sampling rate (frames retained per second of video).
pub const DEFAULT_TARGET_FPS: f64 = 1.0;
/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: i64 = 5;

fn default_target_fps() -> f64 {
    DEFAULT_TARGET_FPS
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

/// A ranked search hit joined with its frame metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    /// 1-based rank in the final result list
    pub rank: usize,
    /// Cosine similarity between query and frame
    pub score: f32,
    pub timestamp_sec: f64,
    pub timestamp_ms: f64,
    pub frame_path: PathBuf,
    pub frame_index: usize,
}

impl SearchResult {
    /// Build a result from a frame record.
    pub fn from_frame(rank: usize, score: f32, frame: &FrameRecord) -> Self {
        Self {
            rank,
            score,
            timestamp_sec: frame.timestamp_sec,
            timestamp_ms: frame.timestamp_ms,
            frame_path: frame.frame_path.clone(),
            frame_index: frame.frame_index,
        }
    }
}

/// Query-string parameters of a search request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Natural-language query text
    pub query: String,
    /// Maximum number of results
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

impl SearchQuery {
    /// Validate the request and return `top_k` as a count.
    pub fn validate(&self) -> Result<usize, String> {
        if self.query.trim().is_empty() {
            return Err("Query must not be empty".to_string());
        }

        if self.top_k <= 0 {
            return Err(format!("top_k must be positive, got {}", self.top_k));
        }

        usize::try_from(self.top_k).map_err(|_| format!("top_k out of range: {}", self.top_k))
    }
}

/// Query-string parameters of an index request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexRequest {
    /// Name of a previously uploaded video
    pub filename: String,
    /// Sampling rate in frames per second
    #[serde(default = "default_target_fps")]
    pub fps: f64,
}

impl IndexRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("Filename is required".to_string());
        }

        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(format!("fps must be positive, got {}", self.fps));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_defaults_top_k() {
        let query: SearchQuery = serde_json::from_str(r#"{"query": "a red car"}"#).unwrap();
        assert_eq!(query.top_k, DEFAULT_TOP_K);
        assert_eq!(query.validate(), Ok(5));
    }

    #[test]
    fn test_search_query_rejects_non_positive_top_k() {
        let zero = SearchQuery {
            query: "dog".to_string(),
            top_k: 0,
        };
        assert!(zero.validate().is_err());

        let negative = SearchQuery {
            query: "dog".to_string(),
            top_k: -3,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_search_query_rejects_blank_text() {
        let blank = SearchQuery {
            query: "   ".to_string(),
            top_k: 5,
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_index_request_defaults_fps() {
        let req: IndexRequest = serde_json::from_str(r#"{"filename": "clip.mp4"}"#).unwrap();
        assert_eq!(req.fps, DEFAULT_TARGET_FPS);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_index_request_rejects_bad_fps() {
        for fps in [0.0, -1.0, f64::NAN] {
            let req = IndexRequest {
                filename: "clip.mp4".to_string(),
                fps,
            };
            assert!(req.validate().is_err(), "fps {} should be rejected", fps);
        }
    }

    #[test]
    fn test_result_from_frame() {
        let frame = FrameRecord::new(7, 7000.0, "frames/frame_00007.jpg");
        let result = SearchResult::from_frame(1, 0.31, &frame);
        assert_eq!(result.rank, 1);
        assert_eq!(result.frame_index, 7);
        assert_eq!(result.timestamp_sec, 7.0);
    }
}
