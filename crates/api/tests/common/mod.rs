#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbaImage};
use muralist_api::config::ServerConfig;
use muralist_api::engine::JobSupervisor;
use muralist_api::router::build_app_router;
use muralist_api::state::AppState;
use muralist_core::storage::LocalArtifactStore;
use muralist_core::synthesis::{ImagePart, ImageSynthesizer, Synthesis, SynthesisError};
use muralist_pipeline::{GenerationPipeline, PipelineMode};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Scripted synthesizer
// ---------------------------------------------------------------------------

/// How the in-process synthesizer answers every call.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// A square image first, then a 9:16 refinement.
    Images,
    /// Text parts only, no image.
    TextOnly,
    /// Never answers within any test's patience.
    Hang,
}

pub struct ScriptedSynthesizer {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedSynthesizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageSynthesizer for ScriptedSynthesizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn synthesize(
        &self,
        _prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<Synthesis, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Images => {
                let (width, height) = if input.is_some() { (90, 160) } else { (200, 200) };
                Ok(Synthesis {
                    text_parts: vec!["Here is your wallpaper".into()],
                    images: vec![ImagePart::from_bytes(png(width, height))],
                })
            }
            Script::TextOnly => Ok(Synthesis {
                text_parts: vec!["I can only describe it in words".into()],
                images: vec![],
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Synthesis::default())
            }
        }
    }
}

/// Encode a blank RGBA image as PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8081".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

/// Router plus the handles tests need to inspect. The artifact directory
/// lives as long as this value.
pub struct TestApp {
    pub router: Router,
    pub supervisor: Arc<JobSupervisor>,
    pub store: Arc<LocalArtifactStore>,
    _artifacts: TempDir,
}

/// Build the full application router over `pool`, generating with `script`
/// in two-stage mode.
pub fn build_test_app(pool: PgPool, script: Script) -> TestApp {
    build_test_app_with(pool, Arc::new(ScriptedSynthesizer::new(script)))
}

/// Like [`build_test_app`], with any synthesizer.
pub fn build_test_app_with(pool: PgPool, synthesizer: Arc<dyn ImageSynthesizer>) -> TestApp {
    let config = test_config();
    let artifacts = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalArtifactStore::new(artifacts.path()));

    let pipeline = GenerationPipeline::new(synthesizer, store.clone(), PipelineMode::Refine)
        .with_call_timeout(Duration::from_secs(10));
    let supervisor = JobSupervisor::new(pool.clone(), Arc::new(pipeline));

    let state = AppState {
        pool,
        supervisor: Arc::clone(&supervisor),
        store: store.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        supervisor,
        store,
        _artifacts: artifacts,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Submit a generation and return its id.
pub async fn submit(app: &Router, body: serde_json::Value) -> String {
    let response = post_json(app.clone(), "/api/v1/generations", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["generation_id"].as_str().unwrap().to_string()
}

/// Poll the status endpoint until the generation is terminal.
pub async fn wait_for_terminal(app: &Router, id: &str) -> serde_json::Value {
    let uri = format!("/api/v1/generations/{id}");
    for _ in 0..250 {
        let json = body_json(get(app.clone(), &uri).await).await;
        let status = json["data"]["status"].as_str().unwrap().to_string();
        if matches!(status.as_str(), "completed" | "failed" | "cancelled") {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("generation {id} did not finish in time");
}

/// Poll until the supervisor has no live tasks.
pub async fn wait_for_idle(supervisor: &JobSupervisor) {
    for _ in 0..250 {
        if supervisor.active_jobs().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("generation tasks did not finish in time");
}

/// Poll until the generation reaches `status`.
pub async fn wait_for_status(app: &Router, id: &str, wanted: &str) {
    let uri = format!("/api/v1/generations/{id}");
    for _ in 0..250 {
        let json = body_json(get(app.clone(), &uri).await).await;
        if json["data"]["status"] == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("generation {id} never reached {wanted}");
}
