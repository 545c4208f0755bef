//! Client for the vision-language embedding service.
//!
//! Frames and query text are embedded into one shared space by an external
//! CLIP-style model service. This crate provides:
//! - The [`EmbeddingProvider`] capability used by the index builder and query engine
//! - An HTTP implementation with batching and retries
//! - Request/response types of the service's wire format

pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{EmbeddingClient, EmbeddingClientConfig};
pub use error::{EmbedError, EmbedResult};
pub use provider::EmbeddingProvider;
pub use types::{EmbedImagesRequest, EmbedResponse, EmbedTextRequest, HealthResponse};
