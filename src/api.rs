//! HTTP API handlers for Burnscope.
//!
//! Every analysis request is recorded in the run history, whether it
//! succeeds or fails. Failures are answered with
//! `{"error": <kind>, "message": <text>}`:
//!
//! | Error kind | Status |
//! |------------|--------|
//! | `validation` | 400 |
//! | `empty_result` | 404 |
//! | `remote_service` | 502 |
//! | `resource_cleanup`, `io` | 500 |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::catalog::{GridSpec, ImageCatalog, TimelapseRenderer};
use crate::config::AnalysisDefaults;
use crate::error::{AnalysisError, Result};
use crate::model::{
    DateRange, ErrorResponse, RunKind, RunRecord, RunsQuery, RunsResponse, SessionQuery,
    SeverityRequestBody, TimeRange, TimelapseRequestBody,
};
use crate::pipeline::{BurnSeverityProduct, BurnSeverityRequest, run_burn_severity};
use crate::query::CloudFilter;
use crate::session::SessionRegistry;
use crate::severity::BandPair;
use crate::storage::Storage;
use crate::timelapse::{
    GoesSatellite, GoesScan, TimelapseAnimation, TimelapseParams, assemble_timelapse,
};

/// Upper bound for GET /runs/recent.
const MAX_RUNS_LIMIT: u32 = 500;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub catalog: Arc<dyn ImageCatalog>,
    pub renderer: Arc<dyn TimelapseRenderer>,
    pub sessions: Arc<Mutex<SessionRegistry>>,
    pub defaults: AnalysisDefaults,
}

impl AppState {
    pub fn new(
        storage: Storage,
        catalog: Arc<dyn ImageCatalog>,
        renderer: Arc<dyn TimelapseRenderer>,
        defaults: AnalysisDefaults,
    ) -> Self {
        Self {
            storage,
            catalog,
            renderer,
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
            defaults,
        }
    }
}

/// All routes, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/severity", post(post_severity))
        .route("/timelapse", post(post_timelapse))
        .route(
            "/timelapse/current",
            get(get_current_timelapse).delete(delete_current_timelapse),
        )
        .route("/runs/recent", get(get_recent_runs))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Error response carrying an [`AnalysisError`].
#[derive(Debug)]
pub struct ApiError(pub AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::EmptyResult { .. } => StatusCode::NOT_FOUND,
            AnalysisError::RemoteService { .. } => StatusCode::BAD_GATEWAY,
            AnalysisError::ResourceCleanup { .. } | AnalysisError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// POST /severity - Run a burn-severity analysis.
///
/// # Request Body
///
/// ```json
/// {
///     "region": {"lat": -15.7938, "lon": -47.8828, "radius_m": 5000},
///     "pre_start": "2023-05-01",
///     "pre_end": "2023-06-01",
///     "post_start": "2023-09-01",
///     "post_end": "2023-10-01",
///     "max_cloud_pct": 20
/// }
/// ```
///
/// `region` may also be a bounding box `{"west", "south", "east", "north"}`.
/// Cloud threshold and bands fall back to the server defaults.
///
/// # Response
///
/// Composites, the severity index expression, three map layers (pre, post,
/// severity) and, with `"materialize": true`, a per-class pixel summary.
#[instrument(skip(state, body), fields(session = %body.session))]
pub async fn post_severity(
    State(state): State<AppState>,
    Json(body): Json<SeverityRequestBody>,
) -> std::result::Result<Json<BurnSeverityProduct>, ApiError> {
    let started_at = Utc::now();

    let result = match severity_request(&body, &state.defaults) {
        Ok(request) => run_burn_severity(state.catalog.as_ref(), &request).await,
        Err(e) => Err(e),
    };

    let message = match &result {
        Ok(product) => format!(
            "{} pre-fire and {} post-fire scenes",
            product.pre.scene_count, product.post.scene_count
        ),
        Err(e) => e.to_string(),
    };
    record_run(&state, &body.session, RunKind::BurnSeverity, started_at, &result, message).await;

    Ok(Json(result?))
}

/// Validate a request body into a pipeline request.
fn severity_request(
    body: &SeverityRequestBody,
    defaults: &AnalysisDefaults,
) -> Result<BurnSeverityRequest> {
    let region = body.region.build(body.envelope)?;
    let pre = DateRange::new(body.pre_start, body.pre_end)?;
    let post = DateRange::new(body.post_start, body.post_end)?;

    let cloud = CloudFilter::sentinel2(body.max_cloud_pct.unwrap_or(defaults.max_cloud_pct))?;
    let bands = match (&body.band_a, &body.band_b) {
        (None, None) => defaults.bands.clone(),
        (a, b) => BandPair::new(
            a.as_deref().unwrap_or(&defaults.bands.a),
            b.as_deref().unwrap_or(&defaults.bands.b),
        )?,
    };

    let materialize = body
        .materialize
        .then(|| GridSpec::new(&region, defaults.scale_m));

    Ok(BurnSeverityRequest {
        region,
        pre,
        post,
        collection_id: defaults.collection_id.clone(),
        cloud,
        bands,
        materialize,
    })
}

/// POST /timelapse - Render a GOES fire timelapse for a session.
///
/// # Request Body
///
/// ```json
/// {
///     "start": "2024-09-10T00:00:00",
///     "end": "2024-09-10T06:00:00",
///     "satellite": "GOES-19",
///     "scan": "full_disk",
///     "frames_per_second": 6,
///     "dimensions": 600,
///     "session": "ops-desk"
/// }
/// ```
///
/// The new animation replaces the session's previous one, whose file is
/// deleted.
#[instrument(skip(state, body), fields(session = %body.session))]
pub async fn post_timelapse(
    State(state): State<AppState>,
    Json(body): Json<TimelapseRequestBody>,
) -> std::result::Result<Json<TimelapseAnimation>, ApiError> {
    let started_at = Utc::now();

    let result = match timelapse_params(&body) {
        Ok(params) => {
            assemble_timelapse(
                state.renderer.as_ref(),
                &state.sessions,
                &body.session,
                &params,
            )
            .await
        }
        Err(e) => Err(e),
    };

    let message = match &result {
        Ok(animation) => format!(
            "{} frames at {} fps",
            animation.frame_count, animation.frames_per_second
        ),
        Err(e) => e.to_string(),
    };
    record_run(&state, &body.session, RunKind::Timelapse, started_at, &result, message).await;

    Ok(Json(result?))
}

fn timelapse_params(body: &TimelapseRequestBody) -> Result<TimelapseParams> {
    let range = TimeRange::new(body.start, body.end)?;
    let mut params = TimelapseParams::new(range)?;

    if let Some(region) = &body.region {
        params.region = region.build(false)?;
    }
    if let Some(satellite) = &body.satellite {
        params.source.satellite = GoesSatellite::parse(satellite)?;
    }
    if let Some(scan) = &body.scan {
        params.source.scan = GoesScan::parse(scan)?;
    }
    params.cadence_secs = body
        .cadence_secs
        .unwrap_or_else(|| params.source.scan.scan_interval_secs());
    if let Some(fps) = body.frames_per_second {
        params.frames_per_second = fps;
    }
    if let Some(dimensions) = body.dimensions {
        params.dimensions = dimensions;
    }

    Ok(params)
}

/// GET /timelapse/current - Download the session's current animation.
#[instrument(skip(state))]
pub async fn get_current_timelapse(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let sessions = state.sessions.lock().await;
    let Some(artifact) = sessions.get(&query.session).and_then(|s| s.current()) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not_found".to_string(),
                message: format!("session {:?} has no timelapse", query.session),
            }),
        )
            .into_response();
    };

    // read under the lock so a concurrent install cannot delete the file
    match tokio::fs::read(artifact.path()).await {
        Ok(bytes) => {
            info!(
                session = %query.session,
                bytes = bytes.len(),
                "Timelapse downloaded"
            );
            (
                [
                    (header::CONTENT_TYPE, artifact.kind().content_type().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", artifact.download_name()),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            warn!(session = %query.session, error = %e, "Failed to read timelapse");
            ApiError(AnalysisError::Io(e)).into_response()
        }
    }
}

/// DELETE /timelapse/current - Release the session's current animation.
///
/// Returns `204 No Content` whether or not an animation existed. The session
/// is forgotten. A failure to delete the file is logged only.
#[instrument(skip(state))]
pub async fn delete_current_timelapse(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> StatusCode {
    state.sessions.lock().await.release(&query.session);
    StatusCode::NO_CONTENT
}

/// GET /runs/recent - Run history, newest first.
///
/// # Query Parameters
///
/// - `limit` (optional): Maximum number of runs (default: 20)
#[instrument(skip(state))]
pub async fn get_recent_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Response {
    match state.storage.recent_runs(query.limit.min(MAX_RUNS_LIMIT)).await {
        Ok(runs) => Json(RunsResponse { runs }).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list runs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "storage".to_string(),
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Persist the outcome of a run. History failures are logged, never returned.
async fn record_run<T>(
    state: &AppState,
    session: &str,
    kind: RunKind,
    started_at: DateTime<Utc>,
    result: &Result<T>,
    message: String,
) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    let run = RunRecord {
        session: session.to_string(),
        kind,
        started_at,
        finished_at: Utc::now(),
        outcome: outcome.to_string(),
        message,
    };

    match result {
        Ok(_) => info!(session, kind = kind.as_str(), message = %run.message, "Run finished"),
        Err(e) => warn!(session, kind = kind.as_str(), error = %e, "Run failed"),
    }

    if let Err(e) = state.storage.insert_run(&run).await {
        warn!(session, error = %e, "Failed to record run");
    }
}
