//! Integration tests for Burnscope API endpoints.
//!
//! These tests verify the full request/response cycle through the HTTP API,
//! with an in-memory catalog and a stub renderer standing in for the remote
//! service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use burnscope::api::{AppState, router};
use burnscope::catalog::{LocalCatalog, LocalScene, TimelapseRenderer};
use burnscope::config::AnalysisDefaults;
use burnscope::error::{AnalysisError, Result};
use burnscope::query::SENTINEL2_SR;
use burnscope::raster::{GeoTransform, Raster};
use burnscope::region::RegionOfInterest;
use burnscope::session::SessionRegistry;
use burnscope::storage::Storage;
use burnscope::timelapse::TimelapseRequest;

/// Writes a numbered fake GIF for every request, or fails when asked to.
#[derive(Default)]
struct StubRenderer {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl TimelapseRenderer for StubRenderer {
    async fn render(&self, request: &TimelapseRequest, out: &Path) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AnalysisError::RemoteService {
                status: Some(503),
                message: "renderer unavailable".to_string(),
            });
        }
        let body = format!("GIF89a#{n} {}", request.start);
        tokio::fs::write(out, body.as_bytes()).await?;
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    catalog: Arc<LocalCatalog>,
    renderer: Arc<StubRenderer>,
    sessions: Arc<Mutex<SessionRegistry>>,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Scene over Brasilia with uniform NIR/SWIR values.
fn scene(day: NaiveDate, cloud: f64, nir: f64, swir: f64) -> LocalScene {
    let footprint = RegionOfInterest::from_bounds(-48.0, -16.0, -47.7, -15.6).unwrap();
    let grid = GeoTransform::covering(footprint.wsen(), 20, 20);
    let raster = Raster::new(20, 20, grid)
        .with_band("B8", vec![nir; 400])
        .unwrap()
        .with_band("B12", vec![swir; 400])
        .unwrap();
    LocalScene::new(day, footprint, raster).with_property("CLOUDY_PIXEL_PERCENTAGE", cloud)
}

fn brasilia_catalog() -> LocalCatalog {
    let mut catalog = LocalCatalog::new();
    catalog.insert(SENTINEL2_SR, scene(date(2023, 5, 10), 5.0, 3000.0, 1000.0));
    catalog.insert(SENTINEL2_SR, scene(date(2023, 5, 25), 90.0, 50.0, 50.0));
    catalog.insert(SENTINEL2_SR, scene(date(2023, 9, 15), 12.0, 1000.0, 3000.0));
    catalog
}

async fn create_harness(catalog: LocalCatalog, renderer: StubRenderer) -> Harness {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    let catalog = Arc::new(catalog);
    let renderer = Arc::new(renderer);
    let state = AppState::new(
        storage,
        catalog.clone(),
        renderer.clone(),
        AnalysisDefaults::default(),
    );
    let sessions = state.sessions.clone();

    Harness {
        server: TestServer::new(router(state)).unwrap(),
        catalog,
        renderer,
        sessions,
    }
}

async fn create_test_server() -> Harness {
    create_harness(brasilia_catalog(), StubRenderer::default()).await
}

fn severity_body() -> Value {
    json!({
        "region": {"lat": -15.7938, "lon": -47.8828, "radius_m": 5000},
        "pre_start": "2023-05-01",
        "pre_end": "2023-06-01",
        "post_start": "2023-09-01",
        "post_end": "2023-10-01",
        "max_cloud_pct": 20,
        "materialize": true,
        "session": "brasilia"
    })
}

fn timelapse_body(start: &str, end: &str) -> Value {
    json!({
        "start": start,
        "end": end,
        "satellite": "GOES-16",
        "scan": "full_disk",
        "frames_per_second": 4,
        "session": "ops"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = create_test_server().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_router_without_test_server() {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    let state = AppState::new(
        storage,
        Arc::new(LocalCatalog::new()),
        Arc::new(StubRenderer::default()),
        AnalysisDefaults::default(),
    );

    let response = router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_severity_success() {
    let harness = create_test_server().await;

    let response = harness.server.post("/severity").json(&severity_body()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pre"]["scene_count"], 1);
    assert_eq!(body["post"]["scene_count"], 1);
    assert_eq!(body["region"]["type"], "Polygon");

    let layers = body["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 3);
    assert_eq!(layers[2]["vis"]["min"], -0.1);
    assert_eq!(layers[2]["vis"]["max"], 0.66);

    let summary = &body["summary"];
    assert!(summary["valid_pixels"].as_u64().unwrap() > 0);
    assert!((summary["mean"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(harness.catalog.materialize_calls(), 1);
}

#[tokio::test]
async fn test_severity_inverted_dates_rejected_before_remote_calls() {
    let harness = create_test_server().await;

    let mut body = severity_body();
    body["pre_start"] = json!("2023-06-01");
    body["pre_end"] = json!("2023-05-01");

    let response = harness.server.post("/severity").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "validation");
    assert_eq!(harness.catalog.size_calls(), 0);
    assert_eq!(harness.catalog.materialize_calls(), 0);
}

#[tokio::test]
async fn test_severity_bad_region_rejected() {
    let harness = create_test_server().await;

    let mut body = severity_body();
    body["region"] = json!({"west": 10.0, "south": 0.0, "east": 5.0, "north": 1.0});

    let response = harness.server.post("/severity").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.catalog.size_calls(), 0);
}

#[tokio::test]
async fn test_severity_empty_post_period() {
    let mut catalog = LocalCatalog::new();
    catalog.insert(SENTINEL2_SR, scene(date(2023, 5, 10), 5.0, 3000.0, 1000.0));
    let harness = create_harness(catalog, StubRenderer::default()).await;

    let response = harness.server.post("/severity").json(&severity_body()).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "empty_result");
    assert!(body["message"].as_str().unwrap().contains("post-fire"));
    assert_eq!(harness.catalog.materialize_calls(), 0);
}

#[tokio::test]
async fn test_timelapse_empty_window_rejected_before_render() {
    let harness = create_test_server().await;

    let response = harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-10T03:00:00", "2024-09-10T03:00:00"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timelapse_supersedes_previous() {
    let harness = create_test_server().await;

    let first = harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-10T00:00:00", "2024-09-10T02:00:00"))
        .await;
    first.assert_status_ok();
    let first: Value = first.json();
    let first_path = PathBuf::from(first["path"].as_str().unwrap());
    assert!(first_path.exists());
    assert_eq!(first["frame_count"], 13);
    assert_eq!(first["download_name"], "goes_fire_2024-09-10T00:00.gif");

    let second = harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-11T00:00:00", "2024-09-11T01:00:00"))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    let second_path = PathBuf::from(second["path"].as_str().unwrap());

    assert!(!first_path.exists(), "superseded animation is deleted");
    assert!(second_path.exists());

    let download = harness.server.get("/timelapse/current?session=ops").await;
    download.assert_status_ok();
    assert_eq!(download.header("content-type"), "image/gif");
    let disposition = download.header("content-disposition");
    assert!(disposition.to_str().unwrap().contains("goes_fire_2024-09-11T00:00.gif"));
    assert!(download.as_bytes().starts_with(b"GIF89a#1"));
}

#[tokio::test]
async fn test_timelapse_render_failure_leaves_no_artifact() {
    let renderer = StubRenderer {
        fail: true,
        ..Default::default()
    };
    let harness = create_harness(brasilia_catalog(), renderer).await;

    let response = harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-10T00:00:00", "2024-09-10T02:00:00"))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "remote_service");

    let download = harness.server.get("/timelapse/current?session=ops").await;
    download.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_current_timelapse() {
    let harness = create_test_server().await;

    let created = harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-10T00:00:00", "2024-09-10T01:00:00"))
        .await;
    let created: Value = created.json();
    let path = PathBuf::from(created["path"].as_str().unwrap());

    let response = harness.server.delete("/timelapse/current?session=ops").await;
    response.assert_status(StatusCode::NO_CONTENT);
    assert!(!path.exists());

    harness
        .server
        .get("/timelapse/current?session=ops")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(harness.sessions.lock().await.get("ops").is_none());
}

#[tokio::test]
async fn test_delete_unknown_sessions_does_not_grow_registry() {
    let harness = create_test_server().await;

    for i in 0..200 {
        harness
            .server
            .delete(&format!("/timelapse/current?session=ghost{i}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    assert!(harness.sessions.lock().await.is_empty());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let harness = create_test_server().await;

    harness
        .server
        .post("/timelapse")
        .json(&timelapse_body("2024-09-10T00:00:00", "2024-09-10T01:00:00"))
        .await
        .assert_status_ok();

    harness
        .server
        .get("/timelapse/current?session=someone-else")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_runs_history_records_success_and_failure() {
    let harness = create_test_server().await;

    harness
        .server
        .post("/severity")
        .json(&severity_body())
        .await
        .assert_status_ok();

    let mut invalid = severity_body();
    invalid["max_cloud_pct"] = json!(150);
    harness
        .server
        .post("/severity")
        .json(&invalid)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = harness.server.get("/runs/recent?limit=10").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let runs = body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["outcome"], "validation");
    assert_eq!(runs[1]["outcome"], "success");
    assert_eq!(runs[1]["kind"], "burn_severity");
    assert_eq!(runs[1]["session"], "brasilia");
}

#[tokio::test]
async fn test_runs_history_storage_failure_has_error_body() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("runs.db").display());
    let storage = Storage::new(&url).await.unwrap();
    let state = AppState::new(
        storage,
        Arc::new(LocalCatalog::new()),
        Arc::new(StubRenderer::default()),
        AnalysisDefaults::default(),
    );
    let server = TestServer::new(router(state)).unwrap();

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("DROP TABLE runs").execute(&pool).await.unwrap();
    pool.close().await;

    let response = server.get("/runs/recent").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "storage");
    assert!(body["message"].as_str().unwrap().contains("runs"));
}
