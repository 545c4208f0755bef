//! Frame source seam between the engine and the video decoder.

use async_trait::async_trait;
use std::path::Path;

use vsearch_media::{FrameSampler, MediaResult};
use vsearch_models::FrameRecord;

/// Something that turns a video into sampled frame images.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Write frame images into `output_dir` and return their records with
    /// dense indices from 0 and non-decreasing timestamps.
    async fn sample(
        &self,
        video_path: &Path,
        output_dir: &Path,
        target_fps: f64,
    ) -> MediaResult<Vec<FrameRecord>>;
}

#[async_trait]
impl FrameSource for FrameSampler {
    async fn sample(
        &self,
        video_path: &Path,
        output_dir: &Path,
        target_fps: f64,
    ) -> MediaResult<Vec<FrameRecord>> {
        FrameSampler::sample(self, video_path, output_dir, target_fps).await
    }
}
