//! Embedding service request/response types.

use serde::{Deserialize, Serialize};

/// Request to embed a batch of images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedImagesRequest {
    /// Model the caller expects to be served by
    pub model: String,
    /// Base64-encoded image files (JPEG)
    pub images: Vec<String>,
}

/// Request to embed a batch of texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    pub model: String,
    pub texts: Vec<String>,
}

/// Embeddings returned by the service, one per input, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Model that produced the vectors
    pub model: String,
    /// Vector dimension
    pub dimension: usize,
    pub embeddings: Vec<Vec<f32>>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
