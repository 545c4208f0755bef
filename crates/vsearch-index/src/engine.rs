//! Search engine state handle.
//!
//! The engine is either `Empty` or `Ready` with an immutable
//! [`IndexSnapshot`]. Build and load produce a complete new snapshot off to
//! the side and swap it in under a short write lock; queries clone the
//! current `Arc` and run without holding any lock.
//!
//! A build samples into a staging directory next to the frames directory.
//! The staged frames replace the live ones only together with the snapshot
//! that references them; a failed build discards them.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use vsearch_embed::EmbeddingProvider;
use vsearch_media::{
    promote_frames_dir, read_frame_image, remove_dir_if_exists, sibling_with_suffix,
    FrameSampler,
};
use vsearch_models::SearchResult;

use crate::builder::IndexBuilder;
use crate::error::{EngineError, EngineResult};
use crate::index::{FlatIpBackend, IndexBackend};
use crate::metrics;
use crate::persistence::{load_snapshot, save_snapshot};
use crate::query::QueryEngine;
use crate::sampler::FrameSource;
use crate::snapshot::IndexSnapshot;

/// Engine lifecycle state.
#[derive(Debug, Clone, Default)]
pub enum EngineState {
    #[default]
    Empty,
    Ready(Arc<IndexSnapshot>),
}

impl EngineState {
    pub fn snapshot(&self) -> Option<&Arc<IndexSnapshot>> {
        match self {
            EngineState::Empty => None,
            EngineState::Ready(snapshot) => Some(snapshot),
        }
    }
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub frame_count: usize,
    pub model: Option<String>,
    pub dimension: Option<usize>,
}

/// Owner of the active index.
pub struct SearchEngine {
    builder: IndexBuilder,
    query: QueryEngine,
    backend: Arc<dyn IndexBackend>,
    state: RwLock<EngineState>,
    /// Serializes build, load and save so at most one of them touches the
    /// frames directory or the artifacts at a time.
    replace_lock: Mutex<()>,
}

impl SearchEngine {
    pub fn new(
        sampler: Arc<dyn FrameSource>,
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn IndexBackend>,
    ) -> Self {
        Self {
            builder: IndexBuilder::new(sampler, Arc::clone(&provider), Arc::clone(&backend)),
            query: QueryEngine::new(provider),
            backend,
            state: RwLock::new(EngineState::Empty),
            replace_lock: Mutex::new(()),
        }
    }

    /// Engine using the FFmpeg sampler from environment config and the
    /// flat inner-product backend.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            Arc::new(FrameSampler::from_env()),
            provider,
            Arc::new(FlatIpBackend),
        )
    }

    /// Current snapshot, if any.
    pub async fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.state.read().await.snapshot().cloned()
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, EngineState::Ready(_))
    }

    pub async fn status(&self) -> EngineStatus {
        match self.snapshot().await {
            Some(snapshot) => EngineStatus {
                ready: true,
                frame_count: snapshot.len(),
                model: Some(snapshot.model.clone()),
                dimension: Some(snapshot.dimension),
            },
            None => EngineStatus {
                ready: false,
                frame_count: 0,
                model: None,
                dimension: None,
            },
        }
    }

    /// Build a new index from `video_path` and make it active.
    ///
    /// Frame images end up in `output_dir`. On any failure the previous
    /// state and its frame images stay active. Returns the number of indexed
    /// frames.
    pub async fn build(
        &self,
        video_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        target_fps: f64,
    ) -> EngineResult<usize> {
        let video_path = video_path.as_ref();
        let output_dir = output_dir.as_ref();
        let span = info_span!("index_build", video = %video_path.display(), target_fps);

        async {
            let _guard = self.replace_lock.lock().await;
            let start = Instant::now();

            let staging = staging_dir(output_dir);
            let result = match self.builder.build(video_path, &staging, target_fps).await {
                Ok(snapshot) => self.commit_build(snapshot, &staging, output_dir).await,
                Err(e) => Err(e),
            };

            if result.is_err() {
                if let Err(e) = remove_dir_if_exists(&staging).await {
                    warn!(path = %staging.display(), error = %e, "Failed to remove staged frames");
                }
            }

            let elapsed = start.elapsed();
            metrics::record_build(result.is_ok(), elapsed.as_secs_f64());

            match result {
                Ok(frame_count) => {
                    info!(
                        frame_count,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Index built"
                    );
                    Ok(frame_count)
                }
                Err(e) => {
                    warn!(error = %e, kind = e.kind(), "Index build failed, keeping previous state");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Rank indexed frames against `text`.
    pub async fn query(&self, text: &str, top_k: usize) -> EngineResult<Vec<SearchResult>> {
        let start = Instant::now();
        let result = self.query_inner(text, top_k).await;
        metrics::record_query(result.is_ok(), start.elapsed().as_secs_f64());

        if let Ok(results) = &result {
            info!(
                top_k,
                results = results.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query complete"
            );
        }
        result
    }

    async fn query_inner(&self, text: &str, top_k: usize) -> EngineResult<Vec<SearchResult>> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid_parameter("query text must not be empty"));
        }
        if top_k == 0 {
            return Err(EngineError::invalid_parameter("top_k must be at least 1"));
        }

        let snapshot = self.snapshot().await.ok_or(EngineError::IndexUnavailable)?;
        self.query.query(&snapshot, text, top_k).await
    }

    /// Persist the active snapshot to `location`.
    pub async fn save(&self, location: impl AsRef<Path>) -> EngineResult<()> {
        let _guard = self.replace_lock.lock().await;
        let snapshot = self.snapshot().await.ok_or(EngineError::IndexUnavailable)?;
        save_snapshot(&snapshot, self.backend.as_ref(), location).await
    }

    /// Replace the active snapshot with the one persisted at `location`.
    ///
    /// Returns the number of loaded frames.
    pub async fn load(&self, location: impl AsRef<Path>) -> EngineResult<usize> {
        let _guard = self.replace_lock.lock().await;
        self.load_locked(location.as_ref()).await
    }

    /// Load from `location` only if the engine is still empty.
    ///
    /// Returns `Ok(true)` if a load happened. Concurrent callers load at most
    /// once.
    pub async fn load_if_empty(&self, location: impl AsRef<Path>) -> EngineResult<bool> {
        if self.is_ready().await {
            return Ok(false);
        }

        let _guard = self.replace_lock.lock().await;
        if self.is_ready().await {
            return Ok(false);
        }

        self.load_locked(location.as_ref()).await?;
        Ok(true)
    }

    /// Caller must hold `replace_lock`.
    async fn load_locked(&self, location: &Path) -> EngineResult<usize> {
        match load_snapshot(self.backend.as_ref(), location).await {
            Ok(snapshot) => {
                metrics::record_load(true);
                let frame_count = snapshot.len();
                if snapshot.model != self.query.model_id() {
                    warn!(
                        indexed = %snapshot.model,
                        provider = %self.query.model_id(),
                        "Loaded index was built with a different embedding model"
                    );
                }
                self.replace(snapshot).await;
                info!(location = %location.display(), frame_count, "Index loaded");
                Ok(frame_count)
            }
            Err(e) => {
                metrics::record_load(false);
                warn!(location = %location.display(), error = %e, "Index load failed");
                Err(e)
            }
        }
    }

    /// Stored image bytes of frame `frame_index` in `frames_dir`.
    pub async fn frame_image(
        &self,
        frames_dir: impl AsRef<Path>,
        frame_index: usize,
    ) -> EngineResult<Vec<u8>> {
        Ok(read_frame_image(frames_dir, frame_index).await?)
    }

    /// Move staged frames into `output_dir` and activate `snapshot`.
    ///
    /// The state write lock is held across the directory swap.
    async fn commit_build(
        &self,
        mut snapshot: IndexSnapshot,
        staging: &Path,
        output_dir: &Path,
    ) -> EngineResult<usize> {
        snapshot.frames.relocate(staging, output_dir);
        let frame_count = snapshot.len();

        let mut state = self.state.write().await;
        promote_frames_dir(staging, output_dir).await?;
        metrics::set_indexed_frames(frame_count);
        *state = EngineState::Ready(Arc::new(snapshot));

        Ok(frame_count)
    }

    async fn replace(&self, snapshot: IndexSnapshot) {
        metrics::set_indexed_frames(snapshot.len());
        *self.state.write().await = EngineState::Ready(Arc::new(snapshot));
    }
}

/// Fresh staging directory next to `output_dir`.
fn staging_dir(output_dir: &Path) -> PathBuf {
    sibling_with_suffix(output_dir, &format!(".staging-{}", Uuid::new_v4().simple()))
}
