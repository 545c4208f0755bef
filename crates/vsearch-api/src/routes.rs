//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{get_frame, get_video, health, index_video, search, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, hide_server_errors, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/upload", post(upload_video))
        .route("/index", post(index_video))
        .route("/video/:filename", get(get_video));

    let search_routes = Router::new()
        .route("/search", get(search))
        .route("/frame/:frame_index", get(get_frame));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let max_body_size = state.config.max_body_size;

    let mut router = Router::new()
        .merge(video_routes)
        .merge(search_routes)
        .merge(health_routes)
        .merge(metrics_routes);

    // Don't expose internal error details in production
    if state.config.is_production() {
        router = router.layer(middleware::from_fn(hide_server_errors));
    }

    router
        // Uploads are large; the extractor default would cap them at 2MB
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
