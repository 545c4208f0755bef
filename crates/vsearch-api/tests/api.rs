//! Router tests against an engine with in-memory sampling and embeddings.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use vsearch_api::error::INTERNAL_ERROR_DETAIL;
use vsearch_api::metrics::init_metrics;
use vsearch_api::{create_router, ApiConfig, AppState};
use vsearch_embed::{EmbedResult, EmbeddingProvider};
use vsearch_index::{artifact_paths, FlatIpBackend, FrameSource, SearchEngine};
use vsearch_media::{frame_path, MediaError, MediaResult};
use vsearch_models::FrameRecord;

const VOCAB: [&str; 3] = ["cat", "dog", "car"];
const LABELS: [&str; 4] = ["cat", "dog", "car", "cat dog"];

fn embed_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; VOCAB.len()];
    for word in text.split_whitespace() {
        if let Some(i) = VOCAB.iter().position(|w| *w == word) {
            v[i] += 1.0;
        }
    }
    v
}

struct LabelSampler;

#[async_trait]
impl FrameSource for LabelSampler {
    async fn sample(
        &self,
        video_path: &Path,
        output_dir: &Path,
        _target_fps: f64,
    ) -> MediaResult<Vec<FrameRecord>> {
        if !video_path.exists() {
            return Err(MediaError::FileNotFound(video_path.to_path_buf()));
        }
        tokio::fs::create_dir_all(output_dir).await?;

        let mut frames = Vec::new();
        for (i, label) in LABELS.iter().enumerate() {
            let path = frame_path(output_dir, i);
            tokio::fs::write(&path, label.as_bytes()).await?;
            frames.push(FrameRecord::new(i, i as f64 * 500.0, path));
        }
        Ok(frames)
    }
}

struct WordProvider;

#[async_trait]
impl EmbeddingProvider for WordProvider {
    fn model_id(&self) -> &str {
        "word-bag"
    }

    fn dimension(&self) -> usize {
        VOCAB.len()
    }

    async fn encode_images(&self, images: &[PathBuf]) -> EmbedResult<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        for path in images {
            let text = tokio::fs::read_to_string(path).await.unwrap_or_default();
            out.push(embed_words(&text));
        }
        Ok(out)
    }

    async fn encode_texts(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_words(t)).collect())
    }
}

struct TestApp {
    dir: TempDir,
    config: ApiConfig,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ApiConfig {
            video_dir: dir.path().join("uploads"),
            frames_dir: dir.path().join("frames"),
            index_path: dir.path().join("video_index"),
            ..ApiConfig::default()
        };
        std::fs::create_dir_all(&config.video_dir).unwrap();
        Self { dir, config }
    }

    /// A router around a fresh, empty engine.
    fn router(&self) -> Router {
        create_router(self.state(), None)
    }

    fn state(&self) -> AppState {
        let engine = SearchEngine::new(
            Arc::new(LabelSampler),
            Arc::new(WordProvider),
            Arc::new(FlatIpBackend),
        );
        AppState::with_engine(self.config.clone(), Arc::new(engine))
    }

    fn uploaded_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.config.video_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn put_video(&self, name: &str) {
        std::fs::write(self.config.video_dir.join(name), b"fake video bytes").unwrap();
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn multipart_upload(filename: &str, contents: &[u8]) -> Request<Body> {
    let boundary = "vsearch-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_empty_engine() {
    let app = TestApp::new();
    let router = app.router();

    let (status, body) = send_json(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["indexed"], false);
    assert_eq!(body["frame_count"], 0);
}

#[tokio::test]
async fn test_search_before_indexing() {
    let app = TestApp::new();
    let router = app.router();

    let (status, body) = send_json(&router, get("/search?query=cat")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("No video indexed"));
}

#[tokio::test]
async fn test_upload_stores_file() {
    let app = TestApp::new();
    let router = app.router();

    let (status, body) =
        send_json(&router, multipart_upload("../holiday.mp4", b"0123456789")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "holiday.mp4");
    assert_eq!(body["size_bytes"], 10);

    let stored = std::fs::read(app.config.video_dir.join("holiday.mp4")).unwrap();
    assert_eq!(stored, b"0123456789");
}

#[tokio::test]
async fn test_upload_leaves_no_partial_files() {
    let app = TestApp::new();
    let router = app.router();

    let (status, _) = send_json(&router, multipart_upload("a.mp4", b"complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.uploaded_files(), vec!["a.mp4".to_string()]);

    // body ends inside the file data, without a closing boundary
    let truncated = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=vsearch-test-boundary",
        )
        .body(Body::from(
            "--vsearch-test-boundary\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"b.mp4\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             partial video da",
        ))
        .unwrap();
    let (status, _) = send(&router, truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.uploaded_files(), vec!["a.mp4".to_string()]);
}

#[tokio::test]
async fn test_upload_rejects_non_video() {
    let app = TestApp::new();
    let router = app.router();

    let (status, body) = send_json(&router, multipart_upload("notes.txt", b"hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Bad request: Invalid video format");
    assert!(!app.config.video_dir.join("notes.txt").exists());
}

#[tokio::test]
async fn test_index_missing_video() {
    let app = TestApp::new();
    let router = app.router();

    let (status, body) = send_json(&router, post("/index?filename=absent.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("absent.mp4"));
}

#[tokio::test]
async fn test_index_rejects_bad_fps() {
    let app = TestApp::new();
    app.put_video("clip.mp4");
    let router = app.router();

    let (status, _) = send_json(&router, post("/index?filename=clip.mp4&fps=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_then_search() {
    let app = TestApp::new();
    app.put_video("clip.mp4");
    let router = app.router();

    let (status, body) = send_json(&router, post("/index?filename=clip.mp4&fps=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "indexed");
    assert_eq!(body["frames"], 4);
    assert_eq!(body["video"], "clip.mp4");
    assert!(artifact_paths(&app.config.index_path).0.exists());

    let (status, body) = send_json(&router, get("/search?query=dog&top_k=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "dog");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["frame_index"], 1);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[0]["timestamp_sec"], 0.5);
    assert_eq!(results[1]["frame_index"], 3);
    assert_eq!(results[1]["rank"], 2);

    let (_, body) = send_json(&router, get("/health")).await;
    assert_eq!(body["indexed"], true);
    assert_eq!(body["frame_count"], 4);
}

#[tokio::test]
async fn test_search_parameter_validation() {
    let app = TestApp::new();
    app.put_video("clip.mp4");
    let router = app.router();
    send_json(&router, post("/index?filename=clip.mp4")).await;

    for uri in ["/search?query=cat&top_k=0", "/search?query=cat&top_k=-3", "/search?query=%20"] {
        let (status, _) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let (status, body) = send_json(&router, get("/search?query=cat&top_k=100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_search_loads_persisted_index() {
    let app = TestApp::new();
    app.put_video("clip.mp4");

    let first = app.router();
    let (status, _) = send_json(&first, post("/index?filename=clip.mp4")).await;
    assert_eq!(status, StatusCode::OK);

    // a new process: fresh engine, same artifacts on disk
    let second = app.router();
    let (status, body) = send_json(&second, get("/search?query=car&top_k=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["frame_index"], 2);
}

#[tokio::test]
async fn test_search_with_corrupt_index() {
    let app = TestApp::new();
    let (metadata, index) = artifact_paths(&app.config.index_path);
    std::fs::write(metadata, b"{\"format_version\": 1").unwrap();
    std::fs::write(index, b"VSFI").unwrap();
    let router = app.router();

    let (status, body) = send_json(&router, get("/search?query=cat")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "persistence_corrupt");
}

#[tokio::test]
async fn test_production_hides_server_error_detail() {
    let mut app = TestApp::new();
    app.config.environment = "production".to_string();
    let (metadata, index) = artifact_paths(&app.config.index_path);
    std::fs::write(metadata, b"{\"format_version\": 1").unwrap();
    std::fs::write(index, b"VSFI").unwrap();
    let router = app.router();

    let (status, body) = send_json(&router, get("/search?query=cat")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], INTERNAL_ERROR_DETAIL);
    assert_eq!(body["code"], "persistence_corrupt");

    // client errors keep their detail
    let (status, body) = send_json(&router, get("/frame/7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Frame not found");
}

#[tokio::test]
async fn test_index_save_failure_reports_live_index() {
    let mut app = TestApp::new();
    app.put_video("clip.mp4");
    // the index directory cannot be created under a regular file
    let blocker = app.dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    app.config.index_path = blocker.join("video_index");
    let router = app.router();

    let (status, body) = send_json(&router, post("/index?filename=clip.mp4")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "index_not_persisted");
    assert!(body["detail"].as_str().unwrap().contains("serving queries"));

    let (status, body) = send_json(&router, get("/search?query=car&top_k=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["frame_index"], 2);
}

#[tokio::test]
async fn test_metrics_label_requests_by_route() {
    let app = TestApp::new();
    let handle = init_metrics().unwrap();
    let router = create_router(app.state(), Some(handle));

    let (status, _) = send(&router, get("/frame/3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, get("/wp-login.php")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("path=\"/frame/:frame_index\""));
    assert!(text.contains("path=\"unmatched\""));
    assert!(!text.contains("wp-login"));
}

#[tokio::test]
async fn test_frame_lookup() {
    let app = TestApp::new();
    app.put_video("clip.mp4");
    let router = app.router();
    send_json(&router, post("/index?filename=clip.mp4")).await;

    let response = router.clone().oneshot(get("/frame/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"car");

    let (status, body) = send_json(&router, get("/frame/40")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Frame not found");
}

#[tokio::test]
async fn test_video_streaming() {
    let app = TestApp::new();
    app.put_video("clip.mov");
    let router = app.router();

    let response = router.clone().oneshot(get("/video/clip.mov")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"fake video bytes");

    let ranged = Request::builder()
        .uri("/video/clip.mov")
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, ranged).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"fake");

    let (status, _) = send(&router, get("/video/missing.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_response_headers() {
    let app = TestApp::new();
    let router = app.router();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(app.dir.path().exists());
}
