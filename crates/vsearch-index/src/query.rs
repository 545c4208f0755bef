//! Text query against a snapshot.

use std::sync::Arc;
use tracing::{debug, warn};

use vsearch_embed::EmbeddingProvider;
use vsearch_models::{FrameMetadataTable, SearchResult};

use crate::error::{EngineError, EngineResult};
use crate::index::{compare_hits, Hit};
use crate::snapshot::IndexSnapshot;
use crate::vector::l2_normalize;

/// Embeds query text and ranks snapshot frames against it.
#[derive(Clone)]
pub struct QueryEngine {
    provider: Arc<dyn EmbeddingProvider>,
}

impl QueryEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Model id queries are embedded with.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Top `top_k` frames of `snapshot` for `text`, best first.
    pub async fn query(
        &self,
        snapshot: &IndexSnapshot,
        text: &str,
        top_k: usize,
    ) -> EngineResult<Vec<SearchResult>> {
        if self.provider.model_id() != snapshot.model {
            return Err(EngineError::ModelMismatch {
                indexed: snapshot.model.clone(),
                provider: self.provider.model_id().to_string(),
            });
        }

        if snapshot.index.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = self.provider.encode_texts(&[text.to_string()]).await?;
        let mut vector = match embeddings.pop() {
            Some(v) if embeddings.is_empty() => v,
            _ => {
                return Err(EngineError::provider_failure(
                    "provider must return exactly one embedding per query",
                ))
            }
        };
        l2_normalize(&mut vector);

        let k = top_k.min(snapshot.index.len());
        let hits = snapshot.index.search(&vector, k)?;
        debug!(k, hits = hits.len(), "Index search complete");

        Ok(join_hits(hits, &snapshot.frames))
    }
}

/// Order hits and attach frame metadata.
///
/// Rows with no metadata record are dropped. Ranks are assigned after the
/// drop, so they stay contiguous from 1.
pub fn join_hits(mut hits: Vec<Hit>, frames: &FrameMetadataTable) -> Vec<SearchResult> {
    hits.sort_by(compare_hits);

    let mut dropped = 0usize;
    let results: Vec<SearchResult> = hits
        .iter()
        .filter_map(|hit| {
            let frame = frames.get(hit.row);
            if frame.is_none() {
                dropped += 1;
            }
            frame.map(|f| (hit.score, f))
        })
        .enumerate()
        .map(|(i, (score, frame))| SearchResult::from_frame(i + 1, score, frame))
        .collect();

    if dropped > 0 {
        warn!(
            dropped,
            table_len = frames.len(),
            "Dropped search hits with no frame metadata"
        );
    }

    results
}
