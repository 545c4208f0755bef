//! Embedding provider capability.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::EmbedResult;

/// A vision-language model mapping images and texts into one vector space.
///
/// Implementations return exactly one vector per input, in input order, each
/// of length [`dimension`](Self::dimension). Vectors are not required to be
/// normalized.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model (and version) producing the vectors.
    fn model_id(&self) -> &str;

    /// Fixed vector dimension of the model.
    fn dimension(&self) -> usize;

    /// Embed a batch of stored images.
    async fn encode_images(&self, images: &[PathBuf]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Embed a batch of texts.
    async fn encode_texts(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>>;
}
