//! Semantic frame index for video search.
//!
//! This crate provides:
//! - Index building: frame sampling, batched embedding, L2 normalization
//! - Query: text embedding, inner-product k-NN, ranking and metadata join
//! - Persistence of the index and frame metadata as a paired artifact
//! - [`SearchEngine`], an explicit `Empty -> Ready` state handle that swaps
//!   whole snapshots so queries never observe a half-built index

pub mod builder;
pub mod engine;
pub mod error;
pub mod index;
pub mod metrics;
pub mod persistence;
pub mod query;
pub mod sampler;
pub mod snapshot;
pub mod vector;

pub use builder::IndexBuilder;
pub use engine::{EngineState, EngineStatus, SearchEngine};
pub use error::{EngineError, EngineResult};
pub use index::{FlatIpBackend, FlatIpIndex, Hit, IndexBackend, IndexError, VectorIndex};
pub use persistence::{artifact_paths, artifacts_exist, load_snapshot, save_snapshot};
pub use query::QueryEngine;
pub use sampler::FrameSource;
pub use snapshot::IndexSnapshot;
