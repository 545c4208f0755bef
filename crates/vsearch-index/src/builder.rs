//! Index builder: sample, embed, normalize, append.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use vsearch_embed::EmbeddingProvider;
use vsearch_models::FrameMetadataTable;

use crate::error::{EngineError, EngineResult};
use crate::index::IndexBackend;
use crate::sampler::FrameSource;
use crate::snapshot::IndexSnapshot;
use crate::vector::normalize_all;

/// Builds fresh index snapshots from a video.
///
/// The builder never touches engine state; it either returns a complete
/// snapshot or an error.
#[derive(Clone)]
pub struct IndexBuilder {
    sampler: Arc<dyn FrameSource>,
    provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn IndexBackend>,
}

impl IndexBuilder {
    pub fn new(
        sampler: Arc<dyn FrameSource>,
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn IndexBackend>,
    ) -> Self {
        Self {
            sampler,
            provider,
            backend,
        }
    }

    /// Sample `video_path` at `target_fps` into `output_dir` and index every
    /// sampled frame.
    pub async fn build(
        &self,
        video_path: &Path,
        output_dir: &Path,
        target_fps: f64,
    ) -> EngineResult<IndexSnapshot> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(EngineError::invalid_parameter(format!(
                "target_fps must be positive, got {}",
                target_fps
            )));
        }

        let frames = self
            .sampler
            .sample(video_path, output_dir, target_fps)
            .await?;

        let dimension = self.provider.dimension();
        let mut index = self.backend.create(dimension)?;

        if frames.is_empty() {
            info!(video = %video_path.display(), "No frames sampled, building empty index");
        } else {
            let paths: Vec<_> = frames.iter().map(|f| f.frame_path.clone()).collect();

            let start = Instant::now();
            let mut vectors = self.provider.encode_images(&paths).await?;
            debug!(
                count = vectors.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Encoded frame images"
            );

            if vectors.len() != frames.len() {
                return Err(EngineError::provider_failure(format!(
                    "provider returned {} embeddings for {} frames",
                    vectors.len(),
                    frames.len()
                )));
            }

            normalize_all(&mut vectors);
            index.add(&vectors)?;
        }

        let frames = FrameMetadataTable::from_records(frames);
        frames
            .validate()
            .map_err(|e| EngineError::SourceUnreadable(format!("sampler produced {}", e)))?;

        Ok(IndexSnapshot::new(index, frames, self.provider.model_id())
            .with_source(video_path, target_fps))
    }
}
