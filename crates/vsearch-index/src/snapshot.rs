//! Immutable index snapshot.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

use vsearch_models::FrameMetadataTable;

use crate::index::VectorIndex;

/// A built or loaded index paired with its frame metadata.
///
/// Row `i` of `index` corresponds to `frames.get(i)`. Snapshots are never
/// mutated after construction; the engine replaces them wholesale.
pub struct IndexSnapshot {
    pub index: Box<dyn VectorIndex>,
    pub frames: FrameMetadataTable,
    /// Embedding model the vectors were produced with
    pub model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    /// Video the frames were sampled from, when known
    pub source_video: Option<PathBuf>,
    pub target_fps: Option<f64>,
}

impl IndexSnapshot {
    pub fn new(
        index: Box<dyn VectorIndex>,
        frames: FrameMetadataTable,
        model: impl Into<String>,
    ) -> Self {
        let dimension = index.dimension();
        Self {
            index,
            frames,
            model: model.into(),
            dimension,
            created_at: Utc::now(),
            source_video: None,
            target_fps: None,
        }
    }

    pub fn with_source(mut self, video: impl Into<PathBuf>, target_fps: f64) -> Self {
        self.source_video = Some(video.into());
        self.target_fps = Some(target_fps);
        self
    }

    /// Number of indexed frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSnapshot")
            .field("index", &self.index)
            .field("frames", &self.frames.len())
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("created_at", &self.created_at)
            .field("source_video", &self.source_video)
            .finish()
    }
}
