//! Shared data models for semantic video search.
//!
//! This crate provides Serde-serializable types for:
//! - Sampled frames and the frame metadata table
//! - Search results and request parameters
//! - Frame file naming shared by the sampler and the frame lookup

pub mod frame;
pub mod search;

// Re-export common types
pub use frame::{
    frame_file_name, parse_frame_file_name, FrameMetadataTable, FrameRecord, MetadataError,
    FRAME_FILE_EXTENSION, FRAME_FILE_PREFIX, FRAME_INDEX_WIDTH,
};
pub use search::{
    IndexRequest, SearchQuery, SearchResult, DEFAULT_TARGET_FPS, DEFAULT_TOP_K,
};
