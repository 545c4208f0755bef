//! Sampled frame models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix for extracted frame images.
pub const FRAME_FILE_PREFIX: &str = "frame_";
/// File extension for extracted frame images.
pub const FRAME_FILE_EXTENSION: &str = "jpg";
/// Zero-padding width of the frame index in file names.
pub const FRAME_INDEX_WIDTH: usize = 5;

/// File name for the image of a sampled frame (e.g. `frame_00042.jpg`).
pub fn frame_file_name(frame_index: usize) -> String {
    format!(
        "{}{:0width$}.{}",
        FRAME_FILE_PREFIX,
        frame_index,
        FRAME_FILE_EXTENSION,
        width = FRAME_INDEX_WIDTH
    )
}

/// Parse a frame index back out of a frame file name.
///
/// Returns `None` for anything that was not produced by [`frame_file_name`].
pub fn parse_frame_file_name(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix(FRAME_FILE_PREFIX)?
        .strip_suffix(FRAME_FILE_EXTENSION)?
        .strip_suffix('.')?;

    if digits.len() < FRAME_INDEX_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// One sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameRecord {
    /// Dense, zero-based index in sampling order (also the vector row)
    pub frame_index: usize,
    /// Presentation timestamp in milliseconds
    pub timestamp_ms: f64,
    /// Presentation timestamp in seconds
    pub timestamp_sec: f64,
    /// Where the frame image is stored
    pub frame_path: PathBuf,
}

impl FrameRecord {
    /// Create a record, deriving `timestamp_sec` from `timestamp_ms`.
    pub fn new(frame_index: usize, timestamp_ms: f64, frame_path: impl Into<PathBuf>) -> Self {
        Self {
            frame_index,
            timestamp_ms,
            timestamp_sec: timestamp_ms / 1000.0,
            frame_path: frame_path.into(),
        }
    }
}

/// Metadata table consistency violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    #[error("frame at position {position} has frame_index {found}")]
    NotDense { position: usize, found: usize },

    #[error("frame {frame_index} has invalid timestamp {timestamp_ms}ms")]
    InvalidTimestamp { frame_index: usize, timestamp_ms: f64 },

    #[error("frame {frame_index} timestamp {timestamp_ms}ms precedes previous frame ({previous_ms}ms)")]
    TimestampRegression {
        frame_index: usize,
        timestamp_ms: f64,
        previous_ms: f64,
    },
}

/// Ordered frame metadata, one record per indexed vector.
///
/// Insertion order is sampling order is `frame_index` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FrameMetadataTable(Vec<FrameRecord>);

impl FrameMetadataTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wrap records in sampling order.
    pub fn from_records(records: Vec<FrameRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a frame by row position.
    pub fn get(&self, row: usize) -> Option<&FrameRecord> {
        self.0.get(row)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.0
    }

    pub fn into_records(self) -> Vec<FrameRecord> {
        self.0
    }

    /// Re-root every frame path under `from` to the same relative path under
    /// `to`. Paths outside `from` are left alone.
    pub fn relocate(&mut self, from: &Path, to: &Path) {
        for record in &mut self.0 {
            if let Ok(relative) = record.frame_path.strip_prefix(from) {
                record.frame_path = to.join(relative);
            }
        }
    }

    /// Check that indices are dense from zero and timestamps never go backwards.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let mut previous_ms: Option<f64> = None;

        for (position, record) in self.0.iter().enumerate() {
            if record.frame_index != position {
                return Err(MetadataError::NotDense {
                    position,
                    found: record.frame_index,
                });
            }

            if !record.timestamp_ms.is_finite() || record.timestamp_ms < 0.0 {
                return Err(MetadataError::InvalidTimestamp {
                    frame_index: record.frame_index,
                    timestamp_ms: record.timestamp_ms,
                });
            }

            if let Some(prev) = previous_ms {
                if record.timestamp_ms < prev {
                    return Err(MetadataError::TimestampRegression {
                        frame_index: record.frame_index,
                        timestamp_ms: record.timestamp_ms,
                        previous_ms: prev,
                    });
                }
            }
            previous_ms = Some(record.timestamp_ms);
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a FrameMetadataTable {
    type Item = &'a FrameRecord;
    type IntoIter = std::slice::Iter<'a, FrameRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
