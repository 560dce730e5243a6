//! API integration tests.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rclip_api::{create_router, ApiConfig, AppState};
use rclip_media::{MediaError, MediaResult, SourceInfo, SourceResolver, TranscodeJob, Transcoder};

/// Resolves every reference to a fixed-length source; `private` references fail.
struct FakeResolver {
    duration: f64,
}

#[async_trait]
impl SourceResolver for FakeResolver {
    async fn resolve(&self, reference: &str) -> MediaResult<SourceInfo> {
        if reference.contains("private") {
            return Err(MediaError::resolve_failed(
                "yt-dlp exited with status Some(1)",
                Some("ERROR: Private video".to_string()),
            ));
        }
        Ok(SourceInfo {
            locator: "https://cdn.example.com/stream.mp4".to_string(),
            duration: self.duration,
            width: 1920,
            height: 1080,
            title: Some("Test video".to_string()),
        })
    }
}

/// Writes a small placeholder file for each clip.
struct FakeTranscoder;

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> MediaResult<()> {
        let body = format!("{}:{}", job.window.start, job.window.duration);
        tokio::fs::write(&job.output, body).await?;
        Ok(())
    }
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

impl TestApp {
    fn new(duration: f64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            output_dir: dir.path().join("output"),
            uploads_dir: dir.path().join("uploads"),
            static_dir: dir.path().join("public"),
            ..Default::default()
        };

        let state = AppState::with_collaborators(
            config,
            Arc::new(FakeResolver { duration }),
            Arc::new(FakeTranscoder),
        );

        Self {
            router: create_router(state, None),
            dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn process(&self, body: Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/process")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn valid_body() -> Value {
    json!({
        "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "minDur": 10,
        "maxDur": 20,
        "resolution": "original"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(45.0);

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_process_missing_parameters() {
    let app = TestApp::new(45.0);

    let response = app
        .process(json!({ "url": "https://youtu.be/x", "minDur": 10 }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required parameters" })
    );
}

#[tokio::test]
async fn test_process_rejects_invalid_input() {
    let app = TestApp::new(45.0);

    let mut inverted = valid_body();
    inverted["minDur"] = json!(20);
    inverted["maxDur"] = json!(10);

    let mut unknown_mode = valid_body();
    unknown_mode["resolution"] = json!("4:3");

    let mut zero = valid_body();
    zero["minDur"] = json!(0);

    for body in [inverted, unknown_mode, zero] {
        let response = app.process(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/process")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_process_produces_gap_free_clips() {
    let app = TestApp::new(45.0);

    let response = app.process(valid_body()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    let clips = body["clips"].as_array().unwrap();
    assert!(!clips.is_empty());
    assert!(body.get("warning").is_none());

    let mut total = 0.0;
    for (i, clip) in clips.iter().enumerate() {
        let n = i + 1;
        assert_eq!(clip["name"], format!("clip_{}.mp4", n));
        assert_eq!(clip["url"], format!("/output/{}/clip_{}.mp4", session_id, n));

        let duration = clip["duration"].as_f64().unwrap();
        assert!((1.0..=20.0).contains(&duration));
        if n < clips.len() {
            assert!(duration >= 10.0);
        }
        total += duration;
    }
    assert!((total - 45.0).abs() < 1e-6);

    let on_disk = app.dir.path().join("output").join(&session_id).join("clip_1.mp4");
    let written = std::fs::read_to_string(on_disk).unwrap();
    assert!(written.starts_with("0:"));
}

#[tokio::test]
async fn test_process_resolution_failure_is_500() {
    let app = TestApp::new(45.0);

    let mut body = valid_body();
    body["url"] = json!("https://www.youtube.com/watch?v=private");

    let response = app.process(body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Failed to process video: "));
    assert!(error.contains("Private video"));
}

#[tokio::test]
async fn test_process_empty_plan_is_500() {
    let app = TestApp::new(0.0);

    let response = app.process(valid_body()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_download_all_unknown_session() {
    let app = TestApp::new(45.0);

    for uri in [
        "/api/download-all/7d444840-9dc0-11d1-b245-5ffdce74fad2",
        "/api/download-all/not-a-session",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "Session not found" }));
    }
}

#[tokio::test]
async fn test_download_all_streams_zip() {
    let app = TestApp::new(45.0);

    let body = body_json(app.process(valid_body()).await).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    let clip_count = body["clips"].as_array().unwrap().len();

    let response = app.get(&format!("/api/download-all/{}", session_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"clips_{}.zip\"", session_id).as_str()
    );

    let bytes = body_bytes(response).await;
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), clip_count);
    assert!(archive.file_names().any(|name| name == "clip_1.mp4"));
}

#[tokio::test]
async fn test_output_clips_are_served() {
    let app = TestApp::new(45.0);

    let body = body_json(app.process(valid_body()).await).await;
    let url = body["clips"][0]["url"].as_str().unwrap().to_string();

    let response = app.get(&url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(String::from_utf8(body_bytes(response).await)
        .unwrap()
        .starts_with("0:"));
}

#[tokio::test]
async fn test_static_assets_are_not_cached() {
    let app = TestApp::new(45.0);
    let public = app.dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<html></html>").unwrap();

    let response = app.get("/index.html").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-store, no-cache, must-revalidate, proxy-revalidate"
    );
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = TestApp::new(45.0);

    let response = app.get("/health").await;
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}
