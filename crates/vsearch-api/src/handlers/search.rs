//! Search handler.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use vsearch_index::{artifact_paths, EngineError};
use vsearch_models::{SearchQuery, SearchResult};

use crate::error::ApiResult;
use crate::state::AppState;

/// Search response.
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Rank indexed frames against a natural-language query.
///
/// An empty engine first loads the persisted index, if one was ever saved.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let top_k = params.validate().map_err(EngineError::InvalidParameter)?;

    if !state.engine.is_ready().await {
        let (metadata, index) = artifact_paths(&state.config.index_path);
        if !metadata.exists() && !index.exists() {
            return Err(EngineError::IndexUnavailable.into());
        }

        if state.engine.load_if_empty(&state.config.index_path).await? {
            info!(
                location = %state.config.index_path.display(),
                "Loaded persisted index for search"
            );
        }
    }

    let results = state.engine.query(&params.query, top_k).await?;

    Ok(Json(SearchResponse {
        query: params.query,
        results,
    }))
}
