//! Axum HTTP API server for semantic video search.
//!
//! This crate provides:
//! - Video upload, indexing and streaming endpoints
//! - Natural-language frame search over the active index
//! - Frame image lookup
//! - Security headers, request ids and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
