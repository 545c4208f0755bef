//! Application state.

use std::sync::Arc;

use vsearch_embed::EmbeddingClient;
use vsearch_index::SearchEngine;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine: Arc<SearchEngine>,
}

impl AppState {
    /// Create new application state backed by the embedding service
    /// configured in the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = EmbeddingClient::from_env()?;

        match client.health_check().await {
            Ok(true) => tracing::info!(
                url = %client.config().base_url,
                model = %client.config().model,
                "Embedding service reachable"
            ),
            _ => tracing::warn!(
                url = %client.config().base_url,
                "Embedding service not reachable yet; indexing and search will fail until it is"
            ),
        }

        tokio::fs::create_dir_all(&config.video_dir).await?;
        tokio::fs::create_dir_all(&config.frames_dir).await?;

        let engine = SearchEngine::with_provider(Arc::new(client));
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// State around an existing engine.
    pub fn with_engine(config: ApiConfig, engine: Arc<SearchEngine>) -> Self {
        Self { config, engine }
    }
}
